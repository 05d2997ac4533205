//! Per-function CFG records.

use super::block::BlockRef;
use crate::ast::NodeId;

/// Position of a function in the module's global function list.
///
/// The list is in build (queue) order, so `FunctionId(0)` is always the
/// module-level init function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub const MODULE: FunctionId = FunctionId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "F{}", self.0)
    }
}

/// The CFG of one function, lambda or of the module's top-level code.
#[derive(Debug, Clone)]
pub struct CfgFunction {
    node: NodeId,
    entry: BlockRef,
    exit: BlockRef,
    nested: Vec<FunctionId>,
    blocks: Vec<BlockRef>,
    last_block_id: u32,
}

impl CfgFunction {
    pub(crate) fn new(node: NodeId, entry: BlockRef, exit: BlockRef, nested: Vec<FunctionId>) -> Self {
        CfgFunction {
            node,
            entry,
            exit,
            nested,
            blocks: Vec::new(),
            last_block_id: 0,
        }
    }

    /// The Function, Lambda or Module node this CFG was built from.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn entry(&self) -> BlockRef {
        self.entry
    }

    /// Every return, uncaught throw and final fallthrough reaches this block.
    pub fn exit(&self) -> BlockRef {
        self.exit
    }

    /// Functions lexically nested directly inside this one, in source order.
    pub fn nested(&self) -> &[FunctionId] {
        &self.nested
    }

    /// Every block allocated for this function, in allocation order. Includes
    /// blocks that are unreachable from `entry` (code after a jump).
    pub fn blocks(&self) -> &[BlockRef] {
        &self.blocks
    }

    pub(crate) fn push_block(&mut self, block: BlockRef) {
        self.blocks.push(block);
    }

    /// Highest block id allocated while building this function. For the
    /// module function this covers every nested function as well.
    pub fn last_block_id(&self) -> u32 {
        self.last_block_id
    }

    pub(crate) fn set_last_block_id(&mut self, id: u32) {
        self.last_block_id = id;
    }
}
