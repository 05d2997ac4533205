//! The CFG traversal engine.
//!
//! One [`FunctionBuilder`] walks one function body with a cursor (the block
//! receiving simple statements) and three target stacks. Simple statements are
//! appended to the cursor; control constructs allocate blocks, wire edges in a
//! fixed order (first successor is always the normal/true edge) and move the
//! cursor to their merge block.
//!
//! After `return`/`break`/`continue`/`throw` the cursor stays on the
//! terminated block. Nothing falls through out of it: the next statement opens
//! a fresh block without predecessors. Finalizing a function is the exception
//! and always links the cursor to the exit.

use super::block::{BlockAttrs, BlockKind, BlockRef};
use super::collector::{body_statements, FunctionCollector, FunctionSeed};
use super::function::{CfgFunction, FunctionId};
use super::targets::{LookupPolicy, TargetStack};
use super::CfgModule;
use crate::ast::{Ast, ForLoopProp, NodeId, NodeKind};
use crate::config::CfgConfig;
use crate::error::{CfgError, Result};
use tracing::{debug, trace};

/// Build every CFG of `ast` with the default configuration.
pub fn build_module(ast: &Ast) -> Result<CfgModule> {
    CfgBuilder::new(ast, CfgConfig::default()).build()
}

/// Builds the CFGs of one compilation unit.
///
/// Not reentrant: one builder owns one [`CfgModule`] arena. Separate units can
/// be built concurrently with separate builders.
pub struct CfgBuilder<'a> {
    ast: &'a Ast,
    config: CfgConfig,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(ast: &'a Ast, config: CfgConfig) -> Self {
        CfgBuilder { ast, config }
    }

    /// Collect nested functions, then build each one in queue order.
    pub fn build(self) -> Result<CfgModule> {
        let seeds = FunctionCollector::new(self.ast).collect()?;
        let mut module = CfgModule::new();

        for seed in &seeds {
            FunctionBuilder::start(self.ast, &self.config, &mut module, seed).run(seed.node)?;
        }

        let last = module.last_block_id();
        module
            .function_mut(FunctionId::MODULE)
            .set_last_block_id(last);

        debug!(
            functions = module.functions().len(),
            blocks = module.block_count(),
            "built module CFG"
        );
        Ok(module)
    }
}

/// Traversal state for the function currently being populated.
struct FunctionBuilder<'a, 'm> {
    ast: &'a Ast,
    config: &'a CfgConfig,
    module: &'m mut CfgModule,
    function: FunctionId,
    exit: BlockRef,
    current: BlockRef,
    breaks: TargetStack<'a>,
    continues: TargetStack<'a>,
    throws: TargetStack<'a>,
}

impl<'a, 'm> FunctionBuilder<'a, 'm> {
    /// Allocate entry, exit and the first working block, and register the
    /// function in the module's global list.
    fn start(
        ast: &'a Ast,
        config: &'a CfgConfig,
        module: &'m mut CfgModule,
        seed: &FunctionSeed,
    ) -> Self {
        let entry = module.alloc_block(BlockKind::Unconditional);
        let exit = module.alloc_block(BlockKind::Join);
        let mut record = CfgFunction::new(seed.node, entry, exit, seed.nested.clone());
        record.push_block(entry);
        record.push_block(exit);
        let function = module.push_function(record);

        let mut throws = TargetStack::new();
        throws.push(exit, BlockKind::Join, None);

        let mut builder = FunctionBuilder {
            ast,
            config,
            module,
            function,
            exit,
            current: entry,
            breaks: TargetStack::new(),
            continues: TargetStack::new(),
            throws,
        };
        let working = builder.new_block(BlockKind::Unconditional);
        builder.edge(entry, working);
        builder.current = working;
        builder
    }

    fn run(mut self, node: NodeId) -> Result<()> {
        let statements = body_statements(self.ast, node)?;
        self.visit_statements(&statements)?;

        // Finalize. A terminated cursor still gets this edge, so the exit may
        // be listed twice.
        let current = self.current;
        self.edge(current, self.exit);
        self.throws.pop();
        debug_assert!(self.breaks.is_empty() && self.continues.is_empty());

        let last = self.module.last_block_id();
        let record = self.module.function_mut(self.function);
        record.set_last_block_id(last);
        debug!(
            function = %self.function,
            node = %self.ast.describe(node),
            blocks = record.blocks().len(),
            "built function CFG"
        );
        Ok(())
    }

    fn new_block(&mut self, kind: BlockKind) -> BlockRef {
        let block = self.module.alloc_block(kind);
        self.module.function_mut(self.function).push_block(block);
        trace!(id = self.module.last_block_id(), %kind, "allocated block");
        block
    }

    fn edge(&mut self, from: BlockRef, to: BlockRef) {
        trace!(
            from = self.module.block(from).id(),
            to = self.module.block(to).id(),
            "edge"
        );
        self.module.block_mut(from).add_successor(to);
    }

    /// Edge from the cursor to `to`, unless the cursor already jumped away.
    fn fall_through(&mut self, to: BlockRef) {
        if !self.module.block(self.current).is_terminated() {
            self.edge(self.current, to);
        }
    }

    /// Move the cursor off a terminated block onto a fresh, unreachable one.
    fn revive(&mut self) {
        if self.module.block(self.current).is_terminated() {
            self.current = self.new_block(BlockKind::Unconditional);
        }
    }

    /// Retag the cursor for a control construct. Blocks whose kind is already
    /// settled (joins, loop headers, other constructs) are left alone and a
    /// fresh block is chained behind them instead.
    fn structural(&mut self, kind: BlockKind, aux: NodeId) -> BlockRef {
        self.revive();
        if !self.module.block(self.current).kind().is_open() {
            let fresh = self.new_block(BlockKind::Unconditional);
            self.edge(self.current, fresh);
            self.current = fresh;
        }
        let block = self.module.block_mut(self.current);
        block.set_kind(kind);
        block.set_aux_node(aux);
        self.current
    }

    fn append(&mut self, node: NodeId) -> Result<()> {
        self.revive();
        let has_call = self.contains_call(node)?;
        let block = self.module.block_mut(self.current);
        block.add_statement(node);
        if has_call {
            block.set_attr(BlockAttrs::HAS_CALL);
        }
        Ok(())
    }

    fn terminate(&mut self, attr: BlockAttrs) {
        let block = self.module.block_mut(self.current);
        block.set_kind(BlockKind::Terminated);
        block.set_attr(attr);
    }

    /// Whether evaluating `node` performs a call. The deep scan stays within
    /// the statement: nested bodies and function definitions are not entered.
    fn contains_call(&self, node: NodeId) -> Result<bool> {
        if !self.config.deep_call_scan {
            return Ok(matches!(self.ast.kind(node)?, NodeKind::Call { .. }));
        }

        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            let kind = self.ast.kind(next)?;
            match kind {
                NodeKind::Call { .. } => return Ok(true),
                NodeKind::Block { .. }
                | NodeKind::Module { .. }
                | NodeKind::Namespace { .. }
                | NodeKind::SwitchCase { .. }
                | NodeKind::Finally { .. } => {}
                NodeKind::Catch { params, .. } => stack.extend(params.iter().copied()),
                _ if kind.is_function_like() || kind.is_type_decl() => {}
                _ => stack.extend(kind.children()),
            }
        }
        Ok(false)
    }

    fn visit_statements(&mut self, nodes: &[NodeId]) -> Result<()> {
        for &node in nodes {
            self.visit(node)?;
        }
        Ok(())
    }

    fn visit(&mut self, node: NodeId) -> Result<()> {
        let ast = self.ast;
        match ast.kind(node)? {
            NodeKind::Return { .. } => {
                self.append(node)?;
                self.edge(self.current, self.exit);
                self.terminate(BlockAttrs::HAS_RETURN);
                Ok(())
            }
            NodeKind::CondBranch {
                cond,
                true_branch,
                false_branch,
            } => self.visit_if(node, *cond, *true_branch, *false_branch),
            NodeKind::ForLoop {
                prop,
                inits,
                cond,
                updates,
                body,
                ..
            } => self.visit_for(node, *prop, inits, *cond, updates, *body),
            NodeKind::WhileLoop { cond, body } => self.visit_while(node, *cond, *body),
            NodeKind::DoLoop { cond, body } => self.visit_do_while(node, *cond, *body),
            NodeKind::Break { target } => self.visit_break(node, target.as_deref()),
            NodeKind::Continue { target } => self.visit_continue(node, target.as_deref()),
            NodeKind::Throw { .. } => self.visit_throw(node),
            NodeKind::Switch {
                discriminant,
                cases,
            } => self.visit_switch(node, *discriminant, cases),
            NodeKind::Try {
                block,
                catches,
                finally,
            } => self.visit_try(node, *block, catches, *finally),
            NodeKind::Block { children } => self.visit_block(node, children),
            NodeKind::Namespace { body, .. } => self.visit_block(node, body),
            kind @ (NodeKind::SwitchCase { .. }
            | NodeKind::Catch { .. }
            | NodeKind::Finally { .. }) => Err(CfgError::UnexpectedNode {
                node,
                expected: "statement",
                found: kind.name(),
            }),
            // Expressions, declarations and function-like markers.
            _ => self.append(node),
        }
    }

    fn visit_if(
        &mut self,
        node: NodeId,
        cond: NodeId,
        true_branch: NodeId,
        false_branch: Option<NodeId>,
    ) -> Result<()> {
        let branch = self.structural(BlockKind::Branch, node);
        self.module.block_mut(branch).set_predicate(cond);
        self.append(cond)?;

        let true_bb = self.new_block(BlockKind::Unconditional);
        self.edge(branch, true_bb);
        let join = self.new_block(BlockKind::Join2);

        let label = self.ast.label(node)?;
        if label.is_some() {
            self.breaks.push(join, BlockKind::Join2, label);
        }

        self.current = true_bb;
        self.visit(true_branch)?;
        self.fall_through(join);

        match false_branch {
            Some(false_branch) => {
                let false_bb = self.new_block(BlockKind::Unconditional);
                self.edge(branch, false_bb);
                self.current = false_bb;
                self.visit(false_branch)?;
                self.fall_through(join);
            }
            None => self.edge(branch, join),
        }

        if label.is_some() {
            self.breaks.pop();
        }
        self.current = join;
        Ok(())
    }

    fn visit_for(
        &mut self,
        node: NodeId,
        prop: ForLoopProp,
        inits: &[NodeId],
        cond: Option<NodeId>,
        updates: &[NodeId],
        body: NodeId,
    ) -> Result<()> {
        self.revive();
        self.visit_statements(inits)?;

        let header = self.loop_header(node);
        match (prop, cond) {
            (ForLoopProp::Regular, Some(cond)) => {
                self.module.block_mut(header).set_predicate(cond);
                self.append(cond)?;
            }
            (ForLoopProp::Regular, None) => {}
            // Iteration is implicit; the loop node stands in for the test.
            (ForLoopProp::ForIn | ForLoopProp::ForOf, _) => {
                self.module.block_mut(header).set_predicate(node);
            }
        }

        let exit = self.loop_body(node, header, body)?;
        self.visit_statements(updates)?;
        self.fall_through(header);
        self.edge(header, exit);
        self.current = exit;
        Ok(())
    }

    fn visit_while(&mut self, node: NodeId, cond: NodeId, body: NodeId) -> Result<()> {
        self.revive();
        let header = self.loop_header(node);
        self.module.block_mut(header).set_predicate(cond);
        self.append(cond)?;

        let exit = self.loop_body(node, header, body)?;
        self.fall_through(header);
        self.edge(header, exit);
        self.current = exit;
        Ok(())
    }

    /// The test runs after the body, so both loop edges leave the block the
    /// body ended in: back-edge first, then exit.
    fn visit_do_while(&mut self, node: NodeId, cond: NodeId, body: NodeId) -> Result<()> {
        self.revive();
        let header = self.loop_header(node);
        let exit = self.loop_body(node, header, body)?;

        self.append(cond)?;
        let tail = self.current;
        self.module.block_mut(tail).set_predicate(cond);
        self.edge(tail, header);
        self.edge(tail, exit);
        self.current = exit;
        Ok(())
    }

    /// Allocate a loop header, enter it from the cursor and move onto it.
    fn loop_header(&mut self, node: NodeId) -> BlockRef {
        let header = self.new_block(BlockKind::LoopHeader);
        self.module.block_mut(header).set_aux_node(node);
        self.fall_through(header);
        self.current = header;
        header
    }

    /// Body block, loop exit and the break/continue scope around the body.
    /// Returns the loop exit; the cursor is left where the body ended.
    fn loop_body(&mut self, node: NodeId, header: BlockRef, body: NodeId) -> Result<BlockRef> {
        let body_bb = self.new_block(BlockKind::Unconditional);
        self.edge(header, body_bb);
        let exit = self.new_block(BlockKind::Join);

        let label = self.ast.label(node)?;
        self.breaks.push(exit, BlockKind::Join, label);
        self.continues.push(header, BlockKind::LoopHeader, label);

        self.current = body_bb;
        self.visit(body)?;

        self.continues.pop();
        self.breaks.pop();
        Ok(exit)
    }

    fn visit_break(&mut self, node: NodeId, label: Option<&str>) -> Result<()> {
        self.append(node)?;
        let target = self
            .breaks
            .resolve(label, LookupPolicy::Innermost)
            .ok_or_else(|| CfgError::UnresolvedBreak {
                label: label.map(str::to_string),
            })?;
        self.edge(self.current, target);
        self.terminate(BlockAttrs::HAS_BREAK);
        Ok(())
    }

    fn visit_continue(&mut self, node: NodeId, label: Option<&str>) -> Result<()> {
        self.append(node)?;
        let target = self
            .continues
            .resolve(label, LookupPolicy::SkipScopeMarkers)
            .ok_or_else(|| CfgError::UnresolvedContinue {
                label: label.map(str::to_string),
            })?;
        self.edge(self.current, target);
        self.terminate(BlockAttrs::HAS_CONTINUE);
        Ok(())
    }

    fn visit_throw(&mut self, node: NodeId) -> Result<()> {
        self.append(node)?;
        let target = self.throw_target()?;
        self.edge(self.current, target);
        self.terminate(BlockAttrs::HAS_THROW);
        Ok(())
    }

    fn throw_target(&self) -> Result<BlockRef> {
        let node = self.module.functions()[self.function.index()].node();
        self.throws
            .resolve(None, LookupPolicy::Innermost)
            .ok_or(CfgError::EmptyThrowTargets(node))
    }

    /// Cases are dispatched through a chain: the switch block enters the first
    /// case block, each case block enters the next one. A body that does not
    /// jump away falls into the following case's body.
    fn visit_switch(&mut self, node: NodeId, discriminant: NodeId, cases: &[NodeId]) -> Result<()> {
        let switch_bb = self.structural(BlockKind::Switch, node);
        self.append(node)?;

        let exit = self.new_block(BlockKind::Join);
        let label = self.ast.label(node)?;
        self.breaks.push(exit, BlockKind::Join, label);

        let mut dispatch = switch_bb;
        let mut previous_end: Option<BlockRef> = None;

        for &case in cases {
            let (is_default, statements) = match self.ast.kind(case)? {
                NodeKind::SwitchCase {
                    is_default,
                    statements,
                    ..
                } => (*is_default, statements),
                other => {
                    return Err(CfgError::UnexpectedNode {
                        node: case,
                        expected: "SwitchCase",
                        found: other.name(),
                    })
                }
            };

            let case_bb = self.new_block(BlockKind::Case);
            self.edge(dispatch, case_bb);
            {
                let block = self.module.block_mut(case_bb);
                block.set_predicate(discriminant);
                block.set_aux_node(case);
            }
            self.current = case_bb;
            self.append(discriminant)?;

            let body_entry = if is_default && self.config.reuse_default_case_block {
                self.module
                    .block_mut(case_bb)
                    .set_kind(BlockKind::Unconditional);
                case_bb
            } else {
                let body = self.new_block(BlockKind::Unconditional);
                self.edge(case_bb, body);
                body
            };

            if let Some(end) = previous_end {
                if !self.module.block(end).is_terminated() {
                    self.edge(end, body_entry);
                }
            }

            self.current = body_entry;
            self.visit_statements(statements)?;

            previous_end = Some(self.current);
            dispatch = case_bb;
        }

        if previous_end.is_some() {
            self.fall_through(exit);
        }
        // No case matched, unless the last dispatch block is also where the
        // last body ended.
        if previous_end != Some(dispatch) {
            self.edge(dispatch, exit);
        }

        self.breaks.pop();
        self.current = exit;
        Ok(())
    }

    fn visit_try(
        &mut self,
        node: NodeId,
        block: NodeId,
        catches: &[NodeId],
        finally: Option<NodeId>,
    ) -> Result<()> {
        let try_bb = self.structural(BlockKind::Try, node);

        let first_catch = if catches.is_empty() {
            None
        } else {
            Some(self.new_block(BlockKind::Catch))
        };
        let join = self.new_block(if finally.is_some() {
            BlockKind::Finally
        } else {
            BlockKind::Join
        });

        let body_bb = self.new_block(BlockKind::Unconditional);
        self.edge(try_bb, body_bb);
        // The first statement of the body may already throw.
        self.edge(try_bb, first_catch.unwrap_or(join));

        self.current = body_bb;
        match first_catch {
            Some(catch_bb) => {
                self.throws.push(catch_bb, BlockKind::Catch, None);
                self.visit(block)?;
                self.throws.pop();
            }
            None => self.visit(block)?,
        }
        self.fall_through(join);

        let mut previous: Option<BlockRef> = None;
        for &catch in catches {
            let catch_block = match self.ast.kind(catch)? {
                NodeKind::Catch { block, .. } => *block,
                other => {
                    return Err(CfgError::UnexpectedNode {
                        node: catch,
                        expected: "Catch",
                        found: other.name(),
                    })
                }
            };

            // Later clauses are tried in order when an earlier one does not match.
            let catch_bb = match (previous, first_catch) {
                (Some(previous), _) => {
                    let next = self.new_block(BlockKind::Catch);
                    self.edge(previous, next);
                    next
                }
                (None, Some(first)) => first,
                (None, None) => self.new_block(BlockKind::Catch),
            };
            self.module.block_mut(catch_bb).set_aux_node(catch);

            self.current = catch_bb;
            self.append(catch)?;
            self.visit(catch_block)?;
            self.fall_through(join);
            previous = Some(catch_bb);
        }

        let Some(finally) = finally else {
            self.current = join;
            return Ok(());
        };

        let finally_block = match self.ast.kind(finally)? {
            NodeKind::Finally { block } => *block,
            NodeKind::Block { .. } => finally,
            other => {
                return Err(CfgError::UnexpectedNode {
                    node: finally,
                    expected: "Finally",
                    found: other.name(),
                })
            }
        };

        self.module.block_mut(join).set_aux_node(finally);
        self.current = join;
        self.visit(finally_block)?;

        // The finally block keeps exactly two successors: normal completion
        // first, then re-propagation of an in-flight exception. When the body
        // held a construct, normal completion already leads into it and the
        // block the body ended in continues to `post`.
        let post = self.new_block(BlockKind::Join);
        let outer = self.throw_target()?;
        self.fall_through(post);
        if !self.module.block(join).is_terminated() {
            self.edge(join, outer);
        }
        self.current = post;
        Ok(())
    }

    /// `{ ... }` and namespaces. Unlabeled blocks without `let`/`const`
    /// declarations are traversed in place.
    fn visit_block(&mut self, node: NodeId, children: &[NodeId]) -> Result<()> {
        let label = self.ast.label(node)?;
        let scoped = children
            .iter()
            .any(|&child| self.ast.is_block_scoped_decl(child));
        if label.is_none() && !scoped && self.config.inline_unscoped_blocks {
            return self.visit_statements(children);
        }

        let block_bb = self.structural(BlockKind::Block, node);
        let body_bb = self.new_block(BlockKind::Unconditional);
        self.edge(block_bb, body_bb);
        let join = self.new_block(BlockKind::Join2);

        if label.is_some() {
            self.breaks.push(join, BlockKind::Join2, label);
            self.continues.push(join, BlockKind::Join2, label);
        }

        self.current = body_bb;
        self.visit_statements(children)?;
        self.fall_through(join);

        if label.is_some() {
            self.continues.pop();
            self.breaks.pop();
        }
        self.current = join;
        Ok(())
    }
}
