use astcfg_core::{build_module, validate, AstBuilder, NodeId};
use astcfg_test_helpers::shape;
use proptest::prelude::*;

/// Statement skeletons; lowered to a real AST with jumps only where they
/// have a target.
#[derive(Debug, Clone)]
enum Stmt {
    Expr,
    Call,
    Let,
    Return,
    Break,
    Continue,
    Throw,
    If(Vec<Stmt>, Option<Vec<Stmt>>),
    While(Vec<Stmt>),
    DoWhile(Vec<Stmt>),
    For(Vec<Stmt>),
    Switch(Vec<(bool, Vec<Stmt>)>),
    Try(Vec<Stmt>, Option<Vec<Stmt>>, Option<Vec<Stmt>>),
    Block(Vec<Stmt>),
    Function(Vec<Stmt>),
}

fn stmt_strategy() -> impl Strategy<Value = Stmt> {
    let leaf = prop_oneof![
        Just(Stmt::Expr),
        Just(Stmt::Call),
        Just(Stmt::Let),
        Just(Stmt::Return),
        Just(Stmt::Break),
        Just(Stmt::Continue),
        Just(Stmt::Throw),
    ];
    leaf.prop_recursive(4, 64, 4, |inner| {
        let body = prop::collection::vec(inner, 0..4);
        prop_oneof![
            (body.clone(), prop::option::of(body.clone()))
                .prop_map(|(then_body, else_body)| Stmt::If(then_body, else_body)),
            body.clone().prop_map(Stmt::While),
            body.clone().prop_map(Stmt::DoWhile),
            body.clone().prop_map(Stmt::For),
            prop::collection::vec((any::<bool>(), body.clone()), 0..4).prop_map(Stmt::Switch),
            (
                body.clone(),
                prop::option::of(body.clone()),
                prop::option::of(body.clone())
            )
                .prop_map(|(block, catch, finally)| Stmt::Try(block, catch, finally)),
            body.clone().prop_map(Stmt::Block),
            body.prop_map(Stmt::Function),
        ]
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    in_loop: bool,
    in_switch: bool,
}

fn lower(b: &mut AstBuilder, stmts: &[Stmt], scope: Scope) -> Vec<NodeId> {
    stmts.iter().map(|stmt| lower_one(b, stmt, scope)).collect()
}

fn lower_one(b: &mut AstBuilder, stmt: &Stmt, scope: Scope) -> NodeId {
    let in_loop = Scope {
        in_loop: true,
        ..scope
    };
    match stmt {
        Stmt::Expr => b.ident("x"),
        Stmt::Call => b.call("f", vec![]),
        Stmt::Let => b.let_("v", None),
        Stmt::Return => b.ret(None),
        Stmt::Break if scope.in_loop || scope.in_switch => b.break_(None),
        Stmt::Continue if scope.in_loop => b.continue_(None),
        Stmt::Break | Stmt::Continue => b.pass(),
        Stmt::Throw => {
            let e = b.ident("e");
            b.throw(e)
        }
        Stmt::If(then_body, else_body) => {
            let c = b.ident("c");
            let then_body = lower(b, then_body, scope);
            let else_body = else_body.as_ref().map(|body| lower(b, body, scope));
            b.if_(c, then_body, else_body)
        }
        Stmt::While(body) => {
            let c = b.ident("c");
            let body = lower(b, body, in_loop);
            let body = b.block(body);
            b.while_(c, body)
        }
        Stmt::DoWhile(body) => {
            let body = lower(b, body, in_loop);
            let body = b.block(body);
            let c = b.ident("c");
            b.do_while(body, c)
        }
        Stmt::For(body) => {
            let zero = b.literal("0");
            let init = b.let_("i", Some(zero));
            let i = b.ident("i");
            let n = b.ident("n");
            let cond = b.binary("<", i, n);
            let one = b.literal("1");
            let update = b.binary("+=", i, one);
            let body = lower(b, body, in_loop);
            let body = b.block(body);
            b.for_(vec![init], Some(cond), vec![update], body)
        }
        Stmt::Switch(cases) => {
            let v = b.ident("v");
            let in_switch = Scope {
                in_switch: true,
                ..scope
            };
            let mut lowered = Vec::with_capacity(cases.len());
            for (is_default, body) in cases {
                let body = lower(b, body, in_switch);
                let case = if *is_default {
                    b.default_case(body)
                } else {
                    let test = b.literal("1");
                    b.case(test, body)
                };
                lowered.push(case);
            }
            b.switch(v, lowered)
        }
        Stmt::Try(block, catch, finally) => {
            let block = lower(b, block, scope);
            let catches = match catch {
                Some(body) => {
                    let body = lower(b, body, scope);
                    vec![b.catch("err", body)]
                }
                None => Vec::new(),
            };
            let finally = finally.as_ref().map(|body| lower(b, body, scope));
            b.try_(block, catches, finally)
        }
        Stmt::Block(body) => {
            let body = lower(b, body, scope);
            b.block(body)
        }
        Stmt::Function(body) => {
            let body = lower(b, body, Scope::default());
            b.function("g", &[], body)
        }
    }
}

fn count_functions(stmts: &[Stmt]) -> usize {
    stmts
        .iter()
        .map(|stmt| match stmt {
            Stmt::Function(body) => 1 + count_functions(body),
            Stmt::If(then_body, else_body) => {
                count_functions(then_body) + else_body.as_deref().map_or(0, count_functions)
            }
            Stmt::While(body) | Stmt::DoWhile(body) | Stmt::For(body) | Stmt::Block(body) => {
                count_functions(body)
            }
            Stmt::Switch(cases) => cases.iter().map(|(_, body)| count_functions(body)).sum(),
            Stmt::Try(block, catch, finally) => {
                count_functions(block)
                    + catch.as_deref().map_or(0, count_functions)
                    + finally.as_deref().map_or(0, count_functions)
            }
            _ => 0,
        })
        .sum()
}

fn program() -> impl Strategy<Value = Vec<Stmt>> {
    prop::collection::vec(stmt_strategy(), 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_generated_programs_build_well_formed_graphs(stmts in program()) {
        let mut b = AstBuilder::new();
        let body = lower(&mut b, &stmts, Scope::default());
        let ast = b.finish_module("generated", body);

        let module = build_module(&ast).unwrap();
        prop_assert_eq!(validate(&module, &ast), Vec::new());
        prop_assert_eq!(module.functions().len(), 1 + count_functions(&stmts));
    }

    #[test]
    fn prop_block_ids_are_dense_and_increasing(stmts in program()) {
        let mut b = AstBuilder::new();
        let body = lower(&mut b, &stmts, Scope::default());
        let ast = b.finish_module("generated", body);

        let module = build_module(&ast).unwrap();
        let ids: Vec<u32> = module.blocks().map(|(_, block)| block.id()).collect();
        let expected: Vec<u32> = (1..=module.last_block_id()).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_building_is_deterministic(stmts in program()) {
        let mut b = AstBuilder::new();
        let body = lower(&mut b, &stmts, Scope::default());
        let ast = b.finish_module("generated", body);

        let first = build_module(&ast).unwrap();
        let second = build_module(&ast).unwrap();
        prop_assert_eq!(shape(&first), shape(&second));
    }
}
