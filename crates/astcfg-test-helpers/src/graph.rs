//! Lookups by block id and id-independent graph shapes.

use astcfg_core::ast::NodeId;
use astcfg_core::cfg::{BasicBlock, BlockKind, BlockRef, CfgModule, FunctionId};

/// Find a block by its numeric id.
///
/// # Panics
///
/// Panics if no block has that id.
pub fn block_by_id(module: &CfgModule, id: u32) -> &BasicBlock {
    module
        .blocks()
        .map(|(_, block)| block)
        .find(|block| block.id() == id)
        .unwrap_or_else(|| panic!("no block with id {}", id))
}

/// Successor ids of block `id`, in edge order.
pub fn succ_ids(module: &CfgModule, id: u32) -> Vec<u32> {
    block_by_id(module, id)
        .successors()
        .iter()
        .map(|&succ| module.block(succ).id())
        .collect()
}

pub fn kind_of(module: &CfgModule, id: u32) -> BlockKind {
    block_by_id(module, id).kind()
}

pub fn statements_of(module: &CfgModule, id: u32) -> Vec<NodeId> {
    block_by_id(module, id).statements().to_vec()
}

/// One block with successors expressed as positions in its function's
/// allocation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockShape {
    pub kind: BlockKind,
    pub attrs: Vec<&'static str>,
    pub statements: Vec<NodeId>,
    pub predicate: Option<NodeId>,
    pub aux_node: Option<NodeId>,
    pub successors: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    pub node: NodeId,
    pub nested: Vec<FunctionId>,
    pub blocks: Vec<BlockShape>,
}

/// The module's graphs with block ids renamed away. Two builds of the same
/// AST are isomorphic exactly when their shapes are equal.
pub fn shape(module: &CfgModule) -> Vec<FunctionShape> {
    module
        .functions()
        .iter()
        .map(|function| {
            let position = |target: BlockRef| {
                function
                    .blocks()
                    .iter()
                    .position(|&block| block == target)
                    .unwrap_or(usize::MAX)
            };
            let blocks = function
                .blocks()
                .iter()
                .map(|&block_ref| {
                    let block = module.block(block_ref);
                    BlockShape {
                        kind: block.kind(),
                        attrs: block.attrs().names(),
                        statements: block.statements().to_vec(),
                        predicate: block.predicate(),
                        aux_node: block.aux_node(),
                        successors: block.successors().iter().map(|&s| position(s)).collect(),
                    }
                })
                .collect();
            FunctionShape {
                node: function.node(),
                nested: function.nested().to_vec(),
                blocks,
            }
        })
        .collect()
}
