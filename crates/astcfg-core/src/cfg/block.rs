//! Basic blocks: the nodes of the control flow graph.

use crate::ast::NodeId;
use bitflags::bitflags;
use id_arena::Id;

/// Arena handle of a basic block.
pub type BlockRef = Id<BasicBlock>;

/// Role of a block in the graph.
///
/// Structural kinds (`Block`, `Branch`, `LoopHeader`, `Switch`, `Case`, `Try`)
/// are assigned once, at creation or at the first structural decision touching
/// an `Unconditional` block. Merge kinds (`Join`, `Join2`, `Catch`, `Finally`)
/// are fixed at creation. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    #[default]
    Unknown,
    Unconditional,
    Block,
    Branch,
    LoopHeader,
    Switch,
    Case,
    Try,
    Catch,
    Finally,
    Yield,
    Terminated,
    Join,
    /// Merge point that also closes a lexical scope.
    Join2,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Unknown => "Unknown",
            BlockKind::Unconditional => "Unconditional",
            BlockKind::Block => "Block",
            BlockKind::Branch => "Branch",
            BlockKind::LoopHeader => "LoopHeader",
            BlockKind::Switch => "Switch",
            BlockKind::Case => "Case",
            BlockKind::Try => "Try",
            BlockKind::Catch => "Catch",
            BlockKind::Finally => "Finally",
            BlockKind::Yield => "Yield",
            BlockKind::Terminated => "Terminated",
            BlockKind::Join => "Join",
            BlockKind::Join2 => "Join2",
        }
    }

    /// Kinds that exist only to merge control flow.
    pub fn is_merge(self) -> bool {
        matches!(
            self,
            BlockKind::Join | BlockKind::Join2 | BlockKind::Catch | BlockKind::Finally
        )
    }

    /// Kinds that may still be retagged by a structural decision.
    pub fn is_open(self) -> bool {
        matches!(self, BlockKind::Unknown | BlockKind::Unconditional)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Behaviors observed inside a block, recorded so later passes need not
    /// rescan its statements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BlockAttrs: u8 {
        const HAS_RETURN = 0x01;
        const HAS_BREAK = 0x02;
        const HAS_CONTINUE = 0x04;
        const HAS_THROW = 0x08;
        const HAS_CALL = 0x10;
    }
}

impl BlockAttrs {
    /// Names of the set flags, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// A straight-line run of statements with explicit successor edges.
///
/// Statements and successors are append-only; successor order carries meaning
/// (the first successor of a branch, loop header, try or case block is the
/// taken/normal edge).
#[derive(Debug, Clone)]
pub struct BasicBlock {
    id: u32,
    kind: BlockKind,
    attrs: BlockAttrs,
    statements: Vec<NodeId>,
    predicate: Option<NodeId>,
    aux_node: Option<NodeId>,
    successors: Vec<BlockRef>,
}

impl BasicBlock {
    pub(crate) fn new(id: u32, kind: BlockKind) -> Self {
        BasicBlock {
            id,
            kind,
            attrs: BlockAttrs::empty(),
            statements: Vec::new(),
            predicate: None,
            aux_node: None,
            successors: Vec::new(),
        }
    }

    /// Module-wide sequence number, assigned at allocation and never reused.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: BlockKind) {
        self.kind = kind;
    }

    pub fn attrs(&self) -> BlockAttrs {
        self.attrs
    }

    pub fn has_attr(&self, attr: BlockAttrs) -> bool {
        self.attrs.contains(attr)
    }

    pub fn set_attr(&mut self, attr: BlockAttrs) {
        self.attrs |= attr;
    }

    pub fn statements(&self) -> &[NodeId] {
        &self.statements
    }

    pub fn add_statement(&mut self, node: NodeId) {
        self.statements.push(node);
    }

    pub fn predicate(&self) -> Option<NodeId> {
        self.predicate
    }

    pub fn set_predicate(&mut self, expr: NodeId) {
        self.predicate = Some(expr);
    }

    /// The control construct that caused this block to be created.
    pub fn aux_node(&self) -> Option<NodeId> {
        self.aux_node
    }

    pub fn set_aux_node(&mut self, node: NodeId) {
        self.aux_node = Some(node);
    }

    pub fn successors(&self) -> &[BlockRef] {
        &self.successors
    }

    pub fn add_successor(&mut self, block: BlockRef) {
        self.successors.push(block);
    }

    pub fn is_terminated(&self) -> bool {
        self.kind == BlockKind::Terminated
    }
}
