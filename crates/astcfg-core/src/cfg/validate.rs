//! Structural invariant checks over a finished [`CfgModule`].
//!
//! The builder never produces violations for a well-formed AST; the checker
//! exists for tests, property tests and the driver's `--validate` flag.

use super::block::{BasicBlock, BlockAttrs, BlockKind, BlockRef};
use super::function::FunctionId;
use super::CfgModule;
use crate::ast::{Ast, NodeKind};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// One broken invariant, located by function and block id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{function}: entry bb{block} has {found} successors, expected exactly 1")]
    EntrySuccessors {
        function: FunctionId,
        block: u32,
        found: usize,
    },

    #[error("{function}: entry bb{block} has {found} predecessors")]
    EntryPredecessors {
        function: FunctionId,
        block: u32,
        found: usize,
    },

    #[error("{function}: bb{block} returns but has no edge to the exit")]
    ReturnWithoutExitEdge { function: FunctionId, block: u32 },

    #[error("{function}: terminated bb{block} has no successor")]
    TerminatedWithoutSuccessor { function: FunctionId, block: u32 },

    #[error("{function}: {kind} bb{block} has {found} successors, expected {expected}")]
    SuccessorCount {
        function: FunctionId,
        block: u32,
        kind: BlockKind,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}: bb{block} has a successor outside the function")]
    ForeignSuccessor { function: FunctionId, block: u32 },
}

/// Check every function of `module`. An empty result means the graph is
/// well-formed.
pub fn validate(module: &CfgModule, ast: &Ast) -> Vec<Violation> {
    let mut violations = Vec::new();
    for index in 0..module.functions().len() {
        validate_function(module, ast, FunctionId(index as u32), &mut violations);
    }
    violations
}

fn validate_function(
    module: &CfgModule,
    ast: &Ast,
    function: FunctionId,
    violations: &mut Vec<Violation>,
) {
    let Some(record) = module.function(function) else {
        return;
    };
    let owned: FxHashSet<BlockRef> = record.blocks().iter().copied().collect();

    let entry = module.block(record.entry());
    if entry.successors().len() != 1 {
        violations.push(Violation::EntrySuccessors {
            function,
            block: entry.id(),
            found: entry.successors().len(),
        });
    }

    let preds = module.predecessors(function);
    let entry_preds = preds.get(&record.entry()).map_or(0, Vec::len);
    if entry_preds != 0 {
        violations.push(Violation::EntryPredecessors {
            function,
            block: entry.id(),
            found: entry_preds,
        });
    }

    for &block_ref in record.blocks() {
        let block = module.block(block_ref);

        if block
            .successors()
            .iter()
            .any(|succ| module.get_block(*succ).is_none() || !owned.contains(succ))
        {
            violations.push(Violation::ForeignSuccessor {
                function,
                block: block.id(),
            });
        }

        if block.has_attr(BlockAttrs::HAS_RETURN) && !block.successors().contains(&record.exit()) {
            violations.push(Violation::ReturnWithoutExitEdge {
                function,
                block: block.id(),
            });
        }

        if block.is_terminated() && block.successors().is_empty() {
            violations.push(Violation::TerminatedWithoutSuccessor {
                function,
                block: block.id(),
            });
        }

        if let Some(violation) = check_successor_count(ast, function, block) {
            violations.push(violation);
        }
    }

    tracing::trace!(%function, violations = violations.len(), "validated function");
}

/// Loop headers have exactly two successors (body, exit), except the header
/// of a do-loop which only enters the body. A finally block leads to normal
/// completion and to the outer throw target. Branch and try blocks have at
/// least their two construct edges.
fn check_successor_count(ast: &Ast, function: FunctionId, block: &BasicBlock) -> Option<Violation> {
    let found = block.successors().len();
    let (expected, ok) = match block.kind() {
        BlockKind::LoopHeader => {
            let is_do_loop = block
                .aux_node()
                .and_then(|node| ast.kind(node).ok())
                .is_some_and(|kind| matches!(kind, NodeKind::DoLoop { .. }));
            if is_do_loop {
                ("1", found == 1)
            } else {
                ("2", found == 2)
            }
        }
        BlockKind::Finally => ("2", found == 2),
        BlockKind::Branch | BlockKind::Try => ("at least 2", found >= 2),
        _ => return None,
    };
    (!ok).then_some(Violation::SuccessorCount {
        function,
        block: block.id(),
        kind: block.kind(),
        expected,
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::cfg::build_module;

    #[test]
    fn test_well_formed_module_has_no_violations() {
        let mut b = AstBuilder::new();
        let c = b.ident("c");
        let x = b.ident("x");
        let brk = b.break_(None);
        let if_stmt = b.if_(x, vec![brk], None);
        let body = b.block(vec![if_stmt]);
        let lp = b.while_(c, body);
        let s = b.ident("s");
        let do_body = b.block(vec![s]);
        let do_loop = b.do_while(do_body, c);
        let ast = b.finish_module("m", vec![lp, do_loop]);

        let module = build_module(&ast).unwrap();
        assert_eq!(validate(&module, &ast), Vec::new());
    }

    #[test]
    fn test_reports_broken_terminated_block() {
        let mut b = AstBuilder::new();
        let a = b.ident("a");
        let ast = b.finish_module("m", vec![a]);

        let mut module = build_module(&ast).unwrap();
        let working = module.module_function().blocks()[2];
        module.block_mut(working).set_kind(BlockKind::Terminated);
        // Still has its edge to exit, so only a dangling terminated block counts.
        assert!(validate(&module, &ast).is_empty());

        let extra = module.alloc_block(BlockKind::Terminated);
        module.function_mut(FunctionId::MODULE).push_block(extra);
        let violations = validate(&module, &ast);
        assert_eq!(
            violations,
            vec![Violation::TerminatedWithoutSuccessor {
                function: FunctionId::MODULE,
                block: 4,
            }]
        );
    }

    #[test]
    fn test_branching_finally_body_validates() {
        let mut b = AstBuilder::new();
        let t = b.ident("t");
        let x = b.ident("x");
        let f = b.ident("f");
        let g = b.ident("g");
        let if_stmt = b.if_(x, vec![f], Some(vec![g]));
        let try_stmt = b.try_(vec![t], vec![], Some(vec![if_stmt]));
        let ast = b.finish_module("m", vec![try_stmt]);

        let module = build_module(&ast).unwrap();
        assert!(validate(&module, &ast).is_empty());
    }

    #[test]
    fn test_reports_finally_with_extra_successor() {
        let mut b = AstBuilder::new();
        let t = b.ident("t");
        let f = b.ident("f");
        let try_stmt = b.try_(vec![t], vec![], Some(vec![f]));
        let ast = b.finish_module("m", vec![try_stmt]);

        let mut module = build_module(&ast).unwrap();
        assert!(validate(&module, &ast).is_empty());

        let (finally, _) = module
            .blocks()
            .find(|(_, block)| block.kind() == BlockKind::Finally)
            .unwrap();
        let exit = module.module_function().exit();
        module.block_mut(finally).add_successor(exit);
        assert_eq!(
            validate(&module, &ast),
            vec![Violation::SuccessorCount {
                function: FunctionId::MODULE,
                block: 4,
                kind: BlockKind::Finally,
                expected: "2",
                found: 3,
            }]
        );
    }

    #[test]
    fn test_reports_entry_with_extra_successor() {
        let ast = AstBuilder::new().finish_module("m", vec![]);
        let mut module = build_module(&ast).unwrap();
        let function = module.module_function();
        let (entry, exit) = (function.entry(), function.exit());
        module.block_mut(entry).add_successor(exit);

        let violations = validate(&module, &ast);
        assert_eq!(
            violations,
            vec![Violation::EntrySuccessors {
                function: FunctionId::MODULE,
                block: 1,
                found: 2,
            }]
        );
        assert_eq!(
            violations[0].to_string(),
            "F0: entry bb1 has 2 successors, expected exactly 1"
        );
    }
}
