//! Control Flow Graph (CFG) construction from the AST.
//!
//! The pipeline for one compilation unit:
//!
//! ```text
//! FunctionCollector (queue of function records, module init function first)
//!  └─> CfgBuilder (one traversal per function, in queue order)
//!       └─> CfgModule (arena of blocks + global function list)
//!            ├─> validate (structural invariants)
//!            └─> dump / dot (debug export)
//! ```
//!
//! Design: blocks live in an `id_arena` owned by [`CfgModule`] and refer to
//! each other through [`BlockRef`] handles; statements, predicates and aux
//! nodes are [`NodeId`](crate::ast::NodeId) handles into the AST. Nothing is
//! freed before the module itself is dropped.

pub mod block;
pub mod builder;
pub mod collector;
pub mod dot;
pub mod dump;
pub mod function;
pub mod targets;
pub mod validate;

pub use block::{BasicBlock, BlockAttrs, BlockKind, BlockRef};
pub use builder::{build_module, CfgBuilder};
pub use collector::{FunctionCollector, FunctionSeed};
pub use function::{CfgFunction, FunctionId};
pub use targets::{LookupPolicy, Target, TargetStack};
pub use validate::{validate, Violation};

use crate::ast::NodeId;
use id_arena::Arena;
use rustc_hash::{FxHashMap, FxHashSet};

/// All CFGs of one compilation unit.
#[derive(Debug)]
pub struct CfgModule {
    blocks: Arena<BasicBlock>,
    /// Global function list in build order; index 0 is the module function.
    functions: Vec<CfgFunction>,
    last_block_id: u32,
}

impl CfgModule {
    pub(crate) fn new() -> Self {
        CfgModule {
            blocks: Arena::new(),
            functions: Vec::new(),
            last_block_id: 0,
        }
    }

    /// Allocate a block with the next id. Ids start at 1 and are never reused.
    pub(crate) fn alloc_block(&mut self, kind: BlockKind) -> BlockRef {
        self.last_block_id += 1;
        self.blocks.alloc(BasicBlock::new(self.last_block_id, kind))
    }

    pub(crate) fn block_mut(&mut self, block: BlockRef) -> &mut BasicBlock {
        &mut self.blocks[block]
    }

    pub(crate) fn push_function(&mut self, function: CfgFunction) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut CfgFunction {
        &mut self.functions[id.index()]
    }

    /// The block behind a handle produced by this module.
    pub fn block(&self, block: BlockRef) -> &BasicBlock {
        &self.blocks[block]
    }

    /// Like [`CfgModule::block`] but tolerates foreign handles.
    pub fn get_block(&self, block: BlockRef) -> Option<&BasicBlock> {
        self.blocks.get(block)
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockRef, &BasicBlock)> {
        self.blocks.iter()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Highest block id handed out so far.
    pub fn last_block_id(&self) -> u32 {
        self.last_block_id
    }

    pub fn successors(&self, block: BlockRef) -> &[BlockRef] {
        self.block(block).successors()
    }

    pub fn functions(&self) -> &[CfgFunction] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> Option<&CfgFunction> {
        self.functions.get(id.index())
    }

    /// The implicit init function holding the module's top-level code.
    pub fn module_function(&self) -> &CfgFunction {
        &self.functions[FunctionId::MODULE.index()]
    }

    /// The function built from a given Function/Lambda/Module node.
    pub fn function_for_node(&self, node: NodeId) -> Option<FunctionId> {
        self.functions
            .iter()
            .position(|f| f.node() == node)
            .map(|index| FunctionId(index as u32))
    }

    /// Blocks reachable from the function's entry (depth-first, successor
    /// order), followed by its exit if no path reaches it.
    pub fn reachable_blocks(&self, id: FunctionId) -> Vec<BlockRef> {
        let Some(function) = self.function(id) else {
            return Vec::new();
        };
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack = vec![function.entry()];
        while let Some(block) = stack.pop() {
            if !visited.insert(block) {
                continue;
            }
            order.push(block);
            for &succ in self.successors(block).iter().rev() {
                if !visited.contains(&succ) {
                    stack.push(succ);
                }
            }
        }
        if !visited.contains(&function.exit()) {
            order.push(function.exit());
        }
        order
    }

    /// Predecessor lists for every block of a function, derived from the
    /// successor lists. Duplicate arcs collapse to one predecessor entry.
    pub fn predecessors(&self, id: FunctionId) -> FxHashMap<BlockRef, Vec<BlockRef>> {
        let mut preds: FxHashMap<BlockRef, Vec<BlockRef>> = FxHashMap::default();
        let Some(function) = self.function(id) else {
            return preds;
        };
        for &block in function.blocks() {
            preds.entry(block).or_default();
        }
        for &block in function.blocks() {
            for &succ in self.successors(block) {
                let list = preds.entry(succ).or_default();
                if !list.contains(&block) {
                    list.push(block);
                }
            }
        }
        preds
    }

    /// Blocks in reverse postorder from the entry (useful for dataflow).
    pub fn reverse_postorder(&self, id: FunctionId) -> Vec<BlockRef> {
        let Some(function) = self.function(id) else {
            return Vec::new();
        };
        let mut visited = FxHashSet::default();
        let mut postorder = Vec::with_capacity(function.blocks().len());
        self.dfs_postorder(function.entry(), &mut visited, &mut postorder);
        postorder.reverse();
        postorder
    }

    fn dfs_postorder(
        &self,
        block: BlockRef,
        visited: &mut FxHashSet<BlockRef>,
        postorder: &mut Vec<BlockRef>,
    ) {
        if !visited.insert(block) {
            return;
        }
        for &succ in self.successors(block) {
            self.dfs_postorder(succ, visited, postorder);
        }
        postorder.push(block);
    }
}
