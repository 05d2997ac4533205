//! Language-agnostic AST consumed by the CFG builder.
//!
//! The front ends own parsing and semantic analysis; this module only models
//! the read-only view the builder needs: a closed set of node kinds, child
//! access in source order, and statement labels.
//!
//! Nodes live in a flat table and refer to each other through [`NodeId`]
//! handles, so the same representation doubles as the JSON interchange format
//! used by the driver:
//!
//! ```json
//! { "root": 2, "nodes": [
//!     { "kind": "Identifier", "name": "a" },
//!     { "kind": "Return", "value": 0 },
//!     { "kind": "Module", "name": "m", "body": [1] }
//! ] }
//! ```

mod builder;

pub use builder::AstBuilder;

use crate::error::{CfgError, Result};
use serde::{Deserialize, Serialize};

/// Handle of a node inside an [`Ast`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage class of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeclProp {
    /// Function-scoped (`var`).
    #[default]
    Var,
    /// Block-scoped, mutable (`let`).
    Let,
    /// Block-scoped, immutable (`const`).
    Const,
}

/// Flavor of a `for` loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ForLoopProp {
    /// `for (init; cond; update)`
    #[default]
    Regular,
    /// `for (x in obj)`
    ForIn,
    /// `for (x of iterable)`
    ForOf,
}

/// One node of the tree. `label` carries the statement label of loops,
/// conditionals, switches and blocks (`outer: while (...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Every node kind the CFG builder distinguishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    Module {
        name: String,
        body: Vec<NodeId>,
    },
    Identifier {
        name: String,
    },
    Literal {
        value: String,
    },
    Unary {
        op: String,
        operand: NodeId,
    },
    Binary {
        op: String,
        lhs: NodeId,
        rhs: NodeId,
    },
    Ternary {
        cond: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Cast {
        ty: NodeId,
        expr: NodeId,
    },
    Decl {
        var: NodeId,
        init: Option<NodeId>,
        #[serde(default)]
        prop: DeclProp,
    },
    Import {
        path: String,
        #[serde(default)]
        targets: Vec<NodeId>,
    },
    Export {
        items: Vec<NodeId>,
    },
    Field {
        object: NodeId,
        field: NodeId,
    },
    ArrayElement {
        array: NodeId,
        indices: Vec<NodeId>,
    },
    ArrayLiteral {
        elements: Vec<NodeId>,
    },
    New {
        class: NodeId,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    Delete {
        expr: NodeId,
    },
    InstanceOf {
        lhs: NodeId,
        rhs: NodeId,
    },
    TypeOf {
        expr: NodeId,
    },
    TemplateLiteral {
        parts: Vec<NodeId>,
    },
    UserType {
        name: String,
    },
    TypeAlias {
        name: String,
        alias: NodeId,
    },
    Assert {
        expr: NodeId,
        message: Option<NodeId>,
    },
    Call {
        callee: NodeId,
        #[serde(default)]
        args: Vec<NodeId>,
    },
    Function {
        name: String,
        #[serde(default)]
        params: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Lambda {
        #[serde(default)]
        params: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Class {
        name: String,
        members: Vec<NodeId>,
    },
    Interface {
        name: String,
        members: Vec<NodeId>,
    },
    Struct {
        name: String,
        members: Vec<NodeId>,
    },
    Return {
        value: Option<NodeId>,
    },
    CondBranch {
        cond: NodeId,
        true_branch: NodeId,
        false_branch: Option<NodeId>,
    },
    ForLoop {
        #[serde(default)]
        prop: ForLoopProp,
        #[serde(default)]
        inits: Vec<NodeId>,
        cond: Option<NodeId>,
        #[serde(default)]
        updates: Vec<NodeId>,
        variable: Option<NodeId>,
        iterable: Option<NodeId>,
        body: NodeId,
    },
    WhileLoop {
        cond: NodeId,
        body: NodeId,
    },
    DoLoop {
        cond: NodeId,
        body: NodeId,
    },
    Break {
        target: Option<String>,
    },
    Continue {
        target: Option<String>,
    },
    Switch {
        discriminant: NodeId,
        cases: Vec<NodeId>,
    },
    SwitchCase {
        #[serde(default)]
        tests: Vec<NodeId>,
        #[serde(default)]
        is_default: bool,
        statements: Vec<NodeId>,
    },
    Try {
        block: NodeId,
        #[serde(default)]
        catches: Vec<NodeId>,
        finally: Option<NodeId>,
    },
    Catch {
        #[serde(default)]
        params: Vec<NodeId>,
        block: NodeId,
    },
    Finally {
        block: NodeId,
    },
    Throw {
        exceptions: Vec<NodeId>,
    },
    Block {
        children: Vec<NodeId>,
    },
    Namespace {
        name: String,
        body: Vec<NodeId>,
    },
    Pass,
}

impl NodeKind {
    /// Name of the variant, used in diagnostics and dumps.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Module { .. } => "Module",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Ternary { .. } => "Ternary",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::Decl { .. } => "Decl",
            NodeKind::Import { .. } => "Import",
            NodeKind::Export { .. } => "Export",
            NodeKind::Field { .. } => "Field",
            NodeKind::ArrayElement { .. } => "ArrayElement",
            NodeKind::ArrayLiteral { .. } => "ArrayLiteral",
            NodeKind::New { .. } => "New",
            NodeKind::Delete { .. } => "Delete",
            NodeKind::InstanceOf { .. } => "InstanceOf",
            NodeKind::TypeOf { .. } => "TypeOf",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::UserType { .. } => "UserType",
            NodeKind::TypeAlias { .. } => "TypeAlias",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Call { .. } => "Call",
            NodeKind::Function { .. } => "Function",
            NodeKind::Lambda { .. } => "Lambda",
            NodeKind::Class { .. } => "Class",
            NodeKind::Interface { .. } => "Interface",
            NodeKind::Struct { .. } => "Struct",
            NodeKind::Return { .. } => "Return",
            NodeKind::CondBranch { .. } => "CondBranch",
            NodeKind::ForLoop { .. } => "ForLoop",
            NodeKind::WhileLoop { .. } => "WhileLoop",
            NodeKind::DoLoop { .. } => "DoLoop",
            NodeKind::Break { .. } => "Break",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::SwitchCase { .. } => "SwitchCase",
            NodeKind::Try { .. } => "Try",
            NodeKind::Catch { .. } => "Catch",
            NodeKind::Finally { .. } => "Finally",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Block { .. } => "Block",
            NodeKind::Namespace { .. } => "Namespace",
            NodeKind::Pass => "Pass",
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Identifier { .. }
            | NodeKind::Literal { .. }
            | NodeKind::UserType { .. }
            | NodeKind::Break { .. }
            | NodeKind::Continue { .. }
            | NodeKind::Pass => Vec::new(),
            NodeKind::Module { body, .. } | NodeKind::Namespace { body, .. } => body.clone(),
            NodeKind::Unary { operand, .. } => vec![*operand],
            NodeKind::Binary { lhs, rhs, .. } | NodeKind::InstanceOf { lhs, rhs } => {
                vec![*lhs, *rhs]
            }
            NodeKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => vec![*cond, *then_expr, *else_expr],
            NodeKind::Cast { ty, expr } => vec![*ty, *expr],
            NodeKind::Decl { var, init, .. } => std::iter::once(*var).chain(*init).collect(),
            NodeKind::Import { targets, .. } => targets.clone(),
            NodeKind::Export { items } => items.clone(),
            NodeKind::Field { object, field } => vec![*object, *field],
            NodeKind::ArrayElement { array, indices } => {
                std::iter::once(*array).chain(indices.iter().copied()).collect()
            }
            NodeKind::ArrayLiteral { elements } => elements.clone(),
            NodeKind::New { class, args } => {
                std::iter::once(*class).chain(args.iter().copied()).collect()
            }
            NodeKind::Delete { expr } | NodeKind::TypeOf { expr } => vec![*expr],
            NodeKind::TemplateLiteral { parts } => parts.clone(),
            NodeKind::TypeAlias { alias, .. } => vec![*alias],
            NodeKind::Assert { expr, message } => std::iter::once(*expr).chain(*message).collect(),
            NodeKind::Call { callee, args } => {
                std::iter::once(*callee).chain(args.iter().copied()).collect()
            }
            NodeKind::Function { params, body, .. } | NodeKind::Lambda { params, body } => {
                params.iter().copied().chain(*body).collect()
            }
            NodeKind::Class { members, .. }
            | NodeKind::Interface { members, .. }
            | NodeKind::Struct { members, .. } => members.clone(),
            NodeKind::Return { value } => value.iter().copied().collect(),
            NodeKind::CondBranch {
                cond,
                true_branch,
                false_branch,
            } => [*cond, *true_branch].into_iter().chain(*false_branch).collect(),
            NodeKind::ForLoop {
                inits,
                cond,
                updates,
                variable,
                iterable,
                body,
                ..
            } => inits
                .iter()
                .copied()
                .chain(*variable)
                .chain(*iterable)
                .chain(*cond)
                .chain(updates.iter().copied())
                .chain(std::iter::once(*body))
                .collect(),
            NodeKind::WhileLoop { cond, body } => vec![*cond, *body],
            NodeKind::DoLoop { cond, body } => vec![*body, *cond],
            NodeKind::Switch {
                discriminant,
                cases,
            } => std::iter::once(*discriminant)
                .chain(cases.iter().copied())
                .collect(),
            NodeKind::SwitchCase {
                tests, statements, ..
            } => tests.iter().chain(statements.iter()).copied().collect(),
            NodeKind::Try {
                block,
                catches,
                finally,
            } => std::iter::once(*block)
                .chain(catches.iter().copied())
                .chain(*finally)
                .collect(),
            NodeKind::Catch { params, block } => {
                params.iter().copied().chain(std::iter::once(*block)).collect()
            }
            NodeKind::Finally { block } => vec![*block],
            NodeKind::Throw { exceptions } => exceptions.clone(),
            NodeKind::Block { children } => children.clone(),
        }
    }

    /// Functions and lambdas get their own CFG.
    pub fn is_function_like(&self) -> bool {
        matches!(self, NodeKind::Function { .. } | NodeKind::Lambda { .. })
    }

    /// Type-like declarations whose members may contain methods.
    pub fn is_type_decl(&self) -> bool {
        matches!(
            self,
            NodeKind::Class { .. } | NodeKind::Interface { .. } | NodeKind::Struct { .. }
        )
    }
}

/// A whole compilation unit: a flat node table plus its root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl Ast {
    /// Wrap an existing node table. Child handles are checked lazily by
    /// [`Ast::node`], so a malformed table surfaces as a build error.
    pub fn new(nodes: Vec<TreeNode>, root: NodeId) -> Self {
        Ast { nodes, root }
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&TreeNode> {
        self.nodes.get(id.index()).ok_or(CfgError::MissingNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn label(&self, id: NodeId) -> Result<Option<&str>> {
        self.node(id).map(|node| node.label.as_deref())
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.kind(id).map(NodeKind::children)
    }

    /// Reject node tables where a node is reachable from itself. Children may
    /// still be shared between parents; only a back edge to a node on the
    /// current path is an error.
    pub fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let mut marks = vec![Mark::New; self.nodes.len()];
        let mut stack = vec![(self.root, false)];
        while let Some((id, leaving)) = stack.pop() {
            let kind = self.kind(id)?;
            let mark = &mut marks[id.index()];
            if leaving {
                *mark = Mark::Done;
                continue;
            }
            match *mark {
                Mark::Done => continue,
                Mark::Open => return Err(CfgError::CyclicNode(id)),
                Mark::New => *mark = Mark::Open,
            }
            stack.push((id, true));
            for child in kind.children().into_iter().rev() {
                self.kind(child)?;
                match marks[child.index()] {
                    Mark::Open => return Err(CfgError::CyclicNode(child)),
                    Mark::New => stack.push((child, false)),
                    Mark::Done => {}
                }
            }
        }
        Ok(())
    }

    /// True for `let`/`const` declarations, the ones that force a block to
    /// get its own scope in the CFG.
    pub fn is_block_scoped_decl(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Ok(NodeKind::Decl {
                prop: DeclProp::Let | DeclProp::Const,
                ..
            })
        )
    }

    /// Short human-readable description: the kind plus its name or value
    /// where the node has one.
    pub fn describe(&self, id: NodeId) -> String {
        let Ok(kind) = self.kind(id) else {
            return format!("{}:<missing>", id);
        };
        let detail = match kind {
            NodeKind::Module { name, .. }
            | NodeKind::Function { name, .. }
            | NodeKind::Class { name, .. }
            | NodeKind::Interface { name, .. }
            | NodeKind::Struct { name, .. }
            | NodeKind::Namespace { name, .. }
            | NodeKind::TypeAlias { name, .. }
            | NodeKind::UserType { name }
            | NodeKind::Identifier { name } => Some(name.as_str()),
            NodeKind::Literal { value } => Some(value.as_str()),
            NodeKind::Import { path, .. } => Some(path.as_str()),
            NodeKind::Unary { op, .. } | NodeKind::Binary { op, .. } => Some(op.as_str()),
            NodeKind::Break { target } | NodeKind::Continue { target } => target.as_deref(),
            _ => None,
        };
        match detail {
            Some(detail) => format!("{}:{}({})", id, kind.name(), detail),
            None => format!("{}:{}", id, kind.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_follow_source_order() {
        let mut b = AstBuilder::new();
        let init = b.let_("i", None);
        let cond = b.ident("c");
        let update = b.ident("u");
        let stmt = b.ident("s");
        let body = b.block(vec![stmt]);
        let for_loop = b.for_(vec![init], Some(cond), vec![update], body);
        let ast = b.finish_module("m", vec![for_loop]);

        assert_eq!(
            ast.children(for_loop).unwrap(),
            vec![init, cond, update, body]
        );
    }

    #[test]
    fn test_block_scoped_decl_detection() {
        let mut b = AstBuilder::new();
        let v = b.var("a", None);
        let l = b.let_("b", None);
        let c = b.const_("c", None);
        let ast = b.finish_module("m", vec![v, l, c]);

        assert!(!ast.is_block_scoped_decl(v));
        assert!(ast.is_block_scoped_decl(l));
        assert!(ast.is_block_scoped_decl(c));
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let ast = Ast::new(Vec::new(), NodeId(0));
        assert!(matches!(ast.node(NodeId(3)), Err(CfgError::MissingNode(NodeId(3)))));
    }

    #[test]
    fn test_shared_children_are_not_a_cycle() {
        let mut b = AstBuilder::new();
        let i = b.ident("i");
        let n = b.ident("n");
        let cond = b.binary("<", i, n);
        let one = b.literal("1");
        let update = b.binary("+=", i, one);
        let ast = b.finish_module("m", vec![cond, update]);

        assert!(ast.check_acyclic().is_ok());
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let ast = Ast::from_json(
            r#"{"nodes":[{"kind":"Unary","op":"-","operand":0},{"kind":"Module","name":"m","body":[0]}],"root":1}"#,
        )
        .unwrap();

        assert!(matches!(ast.check_acyclic(), Err(CfgError::CyclicNode(NodeId(0)))));
    }

    #[test]
    fn test_longer_cycle_is_found() {
        let ast = Ast::from_json(
            r#"{"nodes":[
                {"kind":"Module","name":"m","body":[1]},
                {"kind":"Block","children":[2]},
                {"kind":"Block","children":[1]}
            ],"root":0}"#,
        )
        .unwrap();

        assert!(matches!(ast.check_acyclic(), Err(CfgError::CyclicNode(NodeId(1)))));
    }

    #[test]
    fn test_json_round_trip_keeps_labels() {
        let mut b = AstBuilder::new();
        let cond = b.ident("c");
        let body = b.block(vec![]);
        let lp = b.while_(cond, body);
        let lp = b.with_label(lp, "outer");
        let ast = b.finish_module("m", vec![lp]);

        let json = ast.to_json_pretty().unwrap();
        assert!(json.contains("\"label\": \"outer\""));
        let parsed = Ast::from_json(&json).unwrap();
        assert_eq!(parsed, ast);
    }

    #[test]
    fn test_parse_handwritten_json() {
        let ast = Ast::from_json(
            r#"{ "root": 2, "nodes": [
                { "kind": "Identifier", "name": "a" },
                { "kind": "Return", "value": 0 },
                { "kind": "Module", "name": "m", "body": [1] }
            ] }"#,
        )
        .unwrap();

        assert_eq!(ast.len(), 3);
        assert_eq!(ast.kind(ast.root()).unwrap().name(), "Module");
        assert_eq!(ast.describe(NodeId(0)), "#0:Identifier(a)");
    }
}
