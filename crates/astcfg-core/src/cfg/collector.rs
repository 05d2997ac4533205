//! Nested-function discovery.
//!
//! Runs before any block is built. Every function-like node gets its own CFG,
//! so the collector peels them off the tree and lays them out in the queue
//! order the builder processes them in: the module init function first, then
//! breadth-first, each function's direct children appended to the tail when
//! the function itself is reached.

use super::function::FunctionId;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::{CfgError, Result};
use tracing::debug;

/// A function waiting to be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSeed {
    pub node: NodeId,
    /// Directly nested functions, as positions in the seed list.
    pub nested: Vec<FunctionId>,
}

pub struct FunctionCollector<'a> {
    ast: &'a Ast,
}

impl<'a> FunctionCollector<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        FunctionCollector { ast }
    }

    /// Walk the whole module and return every function in queue order.
    pub fn collect(&self) -> Result<Vec<FunctionSeed>> {
        let root = self.ast.root();
        let kind = self.ast.kind(root)?;
        if !matches!(kind, NodeKind::Module { .. }) {
            return Err(CfgError::UnexpectedNode {
                node: root,
                expected: "Module",
                found: kind.name(),
            });
        }
        self.ast.check_acyclic()?;

        let mut seeds = vec![FunctionSeed {
            node: root,
            nested: Vec::new(),
        }];
        let mut next = 0;
        while next < seeds.len() {
            let direct = self.direct_nested(seeds[next].node)?;
            let mut nested = Vec::with_capacity(direct.len());
            for node in direct {
                nested.push(FunctionId(seeds.len() as u32));
                seeds.push(FunctionSeed {
                    node,
                    nested: Vec::new(),
                });
            }
            seeds[next].nested = nested;
            next += 1;
        }

        debug!(functions = seeds.len(), "collected nested functions");
        Ok(seeds)
    }

    /// Function-like nodes reachable from `function`'s body without entering
    /// another function body, in source order. Bodiless signatures are skipped.
    fn direct_nested(&self, function: NodeId) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = body_statements(self.ast, function)?;
        stack.reverse();

        while let Some(node) = stack.pop() {
            let kind = self.ast.kind(node)?;
            if kind.is_function_like() {
                if has_body(kind) {
                    found.push(node);
                }
                continue;
            }
            let mut children = kind.children();
            children.reverse();
            stack.extend(children);
        }

        Ok(found)
    }
}

fn has_body(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Function { body: Some(_), .. } | NodeKind::Lambda { body: Some(_), .. }
    )
}

/// Top-level statements of a function-like node: the module body, the
/// children of a block body, or a lone expression body.
pub(crate) fn body_statements(ast: &Ast, function: NodeId) -> Result<Vec<NodeId>> {
    let body = match ast.kind(function)? {
        NodeKind::Module { body, .. } => return Ok(body.clone()),
        NodeKind::Function { body, .. } | NodeKind::Lambda { body, .. } => *body,
        _ => return Err(CfgError::NotAFunction(function)),
    };
    let Some(body) = body else {
        return Ok(Vec::new());
    };
    match ast.kind(body)? {
        NodeKind::Block { children } => Ok(children.clone()),
        _ => Ok(vec![body]),
    }
}
