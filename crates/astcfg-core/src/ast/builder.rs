//! Programmatic AST construction.
//!
//! Front ends that already hold a resolved tree lower it through these
//! constructors; tests use them to spell out small programs. Branch and loop
//! bodies passed as statement lists are wrapped in a `Block` node, matching
//! what a parser produces for `{ ... }`.

use super::{Ast, DeclProp, ForLoopProp, NodeId, NodeKind, TreeNode};

/// Incrementally builds an [`Ast`] node table.
#[derive(Debug, Default)]
pub struct AstBuilder {
    nodes: Vec<TreeNode>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw node and return its handle.
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode { kind, label: None });
        id
    }

    /// Attach a statement label to an already created node.
    pub fn with_label(&mut self, id: NodeId, label: &str) -> NodeId {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.label = Some(label.to_string());
        }
        id
    }

    /// Finish with an explicit root node.
    pub fn finish(self, root: NodeId) -> Ast {
        Ast::new(self.nodes, root)
    }

    /// Wrap `body` in a module node and finish with it as root.
    pub fn finish_module(mut self, name: &str, body: Vec<NodeId>) -> Ast {
        let root = self.module(name, body);
        self.finish(root)
    }

    pub fn module(&mut self, name: &str, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Module {
            name: name.to_string(),
            body,
        })
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Identifier {
            name: name.to_string(),
        })
    }

    pub fn literal(&mut self, value: &str) -> NodeId {
        self.push(NodeKind::Literal {
            value: value.to_string(),
        })
    }

    pub fn unary(&mut self, op: &str, operand: NodeId) -> NodeId {
        self.push(NodeKind::Unary {
            op: op.to_string(),
            operand,
        })
    }

    pub fn binary(&mut self, op: &str, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::Binary {
            op: op.to_string(),
            lhs,
            rhs,
        })
    }

    /// `lhs = rhs` where `lhs` is a plain identifier.
    pub fn assign(&mut self, name: &str, rhs: NodeId) -> NodeId {
        let lhs = self.ident(name);
        self.binary("=", lhs, rhs)
    }

    pub fn ternary(&mut self, cond: NodeId, then_expr: NodeId, else_expr: NodeId) -> NodeId {
        self.push(NodeKind::Ternary {
            cond,
            then_expr,
            else_expr,
        })
    }

    pub fn cast(&mut self, ty: &str, expr: NodeId) -> NodeId {
        let ty = self.user_type(ty);
        self.push(NodeKind::Cast { ty, expr })
    }

    pub fn field(&mut self, object: NodeId, name: &str) -> NodeId {
        let field = self.ident(name);
        self.push(NodeKind::Field { object, field })
    }

    pub fn array_element(&mut self, array: NodeId, indices: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::ArrayElement { array, indices })
    }

    pub fn array_literal(&mut self, elements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::ArrayLiteral { elements })
    }

    pub fn new_object(&mut self, class: &str, args: Vec<NodeId>) -> NodeId {
        let class = self.user_type(class);
        self.push(NodeKind::New { class, args })
    }

    pub fn delete(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::Delete { expr })
    }

    pub fn instance_of(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(NodeKind::InstanceOf { lhs, rhs })
    }

    pub fn type_of(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::TypeOf { expr })
    }

    pub fn template(&mut self, parts: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::TemplateLiteral { parts })
    }

    pub fn user_type(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::UserType {
            name: name.to_string(),
        })
    }

    pub fn type_alias(&mut self, name: &str, target: &str) -> NodeId {
        let alias = self.user_type(target);
        self.push(NodeKind::TypeAlias {
            name: name.to_string(),
            alias,
        })
    }

    pub fn assert(&mut self, expr: NodeId, message: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Assert { expr, message })
    }

    /// Call of a named function: `callee(args...)`.
    pub fn call(&mut self, callee: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.ident(callee);
        self.call_expr(callee, args)
    }

    pub fn call_expr(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Call { callee, args })
    }

    pub fn decl(&mut self, prop: DeclProp, name: &str, init: Option<NodeId>) -> NodeId {
        let var = self.ident(name);
        self.push(NodeKind::Decl { var, init, prop })
    }

    pub fn var(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        self.decl(DeclProp::Var, name, init)
    }

    pub fn let_(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        self.decl(DeclProp::Let, name, init)
    }

    pub fn const_(&mut self, name: &str, init: Option<NodeId>) -> NodeId {
        self.decl(DeclProp::Const, name, init)
    }

    pub fn import(&mut self, path: &str, targets: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Import {
            path: path.to_string(),
            targets,
        })
    }

    pub fn export(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Export { items })
    }

    /// Function with a block body made of `body`.
    pub fn function(&mut self, name: &str, params: &[&str], body: Vec<NodeId>) -> NodeId {
        let params = params.iter().map(|p| self.ident(p)).collect();
        let body = self.block(body);
        self.push(NodeKind::Function {
            name: name.to_string(),
            params,
            body: Some(body),
        })
    }

    /// Bodiless signature, as found in interfaces and ambient declarations.
    pub fn function_signature(&mut self, name: &str, params: &[&str]) -> NodeId {
        let params = params.iter().map(|p| self.ident(p)).collect();
        self.push(NodeKind::Function {
            name: name.to_string(),
            params,
            body: None,
        })
    }

    pub fn lambda(&mut self, params: &[&str], body: Vec<NodeId>) -> NodeId {
        let params = params.iter().map(|p| self.ident(p)).collect();
        let body = self.block(body);
        self.push(NodeKind::Lambda {
            params,
            body: Some(body),
        })
    }

    /// Arrow function whose body is a single expression.
    pub fn lambda_expr(&mut self, params: &[&str], body: NodeId) -> NodeId {
        let params = params.iter().map(|p| self.ident(p)).collect();
        self.push(NodeKind::Lambda {
            params,
            body: Some(body),
        })
    }

    pub fn class(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Class {
            name: name.to_string(),
            members,
        })
    }

    pub fn interface(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Interface {
            name: name.to_string(),
            members,
        })
    }

    pub fn struct_(&mut self, name: &str, members: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Struct {
            name: name.to_string(),
            members,
        })
    }

    pub fn namespace(&mut self, name: &str, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Namespace {
            name: name.to_string(),
            body,
        })
    }

    pub fn block(&mut self, children: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Block { children })
    }

    pub fn pass(&mut self) -> NodeId {
        self.push(NodeKind::Pass)
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Return { value })
    }

    pub fn break_(&mut self, target: Option<&str>) -> NodeId {
        self.push(NodeKind::Break {
            target: target.map(str::to_string),
        })
    }

    pub fn continue_(&mut self, target: Option<&str>) -> NodeId {
        self.push(NodeKind::Continue {
            target: target.map(str::to_string),
        })
    }

    pub fn throw(&mut self, exception: NodeId) -> NodeId {
        self.push(NodeKind::Throw {
            exceptions: vec![exception],
        })
    }

    /// `if (cond) { then_body } else { else_body }`
    pub fn if_(
        &mut self,
        cond: NodeId,
        then_body: Vec<NodeId>,
        else_body: Option<Vec<NodeId>>,
    ) -> NodeId {
        let true_branch = self.block(then_body);
        let false_branch = else_body.map(|body| self.block(body));
        self.cond_branch(cond, true_branch, false_branch)
    }

    pub fn cond_branch(
        &mut self,
        cond: NodeId,
        true_branch: NodeId,
        false_branch: Option<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::CondBranch {
            cond,
            true_branch,
            false_branch,
        })
    }

    /// Regular `for (inits; cond; updates) body`.
    pub fn for_(
        &mut self,
        inits: Vec<NodeId>,
        cond: Option<NodeId>,
        updates: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.push(NodeKind::ForLoop {
            prop: ForLoopProp::Regular,
            inits,
            cond,
            updates,
            variable: None,
            iterable: None,
            body,
        })
    }

    /// `for (variable in iterable) body`
    pub fn for_in(&mut self, variable: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        self.iterator_loop(ForLoopProp::ForIn, variable, iterable, body)
    }

    /// `for (variable of iterable) body`
    pub fn for_of(&mut self, variable: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        self.iterator_loop(ForLoopProp::ForOf, variable, iterable, body)
    }

    fn iterator_loop(
        &mut self,
        prop: ForLoopProp,
        variable: NodeId,
        iterable: NodeId,
        body: NodeId,
    ) -> NodeId {
        self.push(NodeKind::ForLoop {
            prop,
            inits: Vec::new(),
            cond: None,
            updates: Vec::new(),
            variable: Some(variable),
            iterable: Some(iterable),
            body,
        })
    }

    pub fn while_(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::WhileLoop { cond, body })
    }

    pub fn do_while(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.push(NodeKind::DoLoop { cond, body })
    }

    pub fn switch(&mut self, discriminant: NodeId, cases: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Switch {
            discriminant,
            cases,
        })
    }

    pub fn case(&mut self, test: NodeId, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::SwitchCase {
            tests: vec![test],
            is_default: false,
            statements,
        })
    }

    pub fn default_case(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::SwitchCase {
            tests: Vec::new(),
            is_default: true,
            statements,
        })
    }

    /// `try { body } catch... finally { finally_body }`
    pub fn try_(
        &mut self,
        body: Vec<NodeId>,
        catches: Vec<NodeId>,
        finally_body: Option<Vec<NodeId>>,
    ) -> NodeId {
        let block = self.block(body);
        let finally = finally_body.map(|body| {
            let block = self.block(body);
            self.push(NodeKind::Finally { block })
        });
        self.push(NodeKind::Try {
            block,
            catches,
            finally,
        })
    }

    /// `catch (param) { body }`
    pub fn catch(&mut self, param: &str, body: Vec<NodeId>) -> NodeId {
        let param = self.ident(param);
        let block = self.block(body);
        self.push(NodeKind::Catch {
            params: vec![param],
            block,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_wraps_branches_in_blocks() {
        let mut b = AstBuilder::new();
        let c = b.ident("c");
        let a = b.ident("a");
        let if_stmt = b.if_(c, vec![a], None);
        let ast = b.finish_module("m", vec![if_stmt]);

        match ast.kind(if_stmt).unwrap() {
            NodeKind::CondBranch {
                true_branch,
                false_branch,
                ..
            } => {
                assert!(matches!(
                    ast.kind(*true_branch).unwrap(),
                    NodeKind::Block { children } if children == &vec![a]
                ));
                assert!(false_branch.is_none());
            }
            other => panic!("expected CondBranch, got {}", other.name()),
        }
    }

    #[test]
    fn test_with_label() {
        let mut b = AstBuilder::new();
        let body = b.block(vec![]);
        let c = b.ident("c");
        let lp = b.while_(c, body);
        b.with_label(lp, "outer");
        let ast = b.finish_module("m", vec![lp]);

        assert_eq!(ast.label(lp).unwrap(), Some("outer"));
        assert_eq!(ast.label(body).unwrap(), None);
    }

    #[test]
    fn test_try_builds_finally_node() {
        let mut b = AstBuilder::new();
        let t = b.ident("t");
        let f = b.ident("f");
        let try_stmt = b.try_(vec![t], vec![], Some(vec![f]));
        let ast = b.finish_module("m", vec![try_stmt]);

        let NodeKind::Try {
            finally: Some(finally),
            ..
        } = ast.kind(try_stmt).unwrap()
        else {
            panic!("expected try with finally");
        };
        assert_eq!(ast.kind(*finally).unwrap().name(), "Finally");
    }
}
