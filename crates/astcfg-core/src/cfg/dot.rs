//! Graphviz export.
//!
//! Nodes are record-shaped, labeled with the block id, kind and statements.
//! Edges are styled by the role they play in the construct that created them.

use super::block::{BasicBlock, BlockAttrs, BlockKind, BlockRef};
use super::function::FunctionId;
use super::CfgModule;
use crate::ast::Ast;
use dot::{Edges, GraphWalk, LabelText, Labeller, Nodes, Style};
use rustc_hash::FxHashMap;
use std::io;

/// Why an edge exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeRole {
    /// Taken when the block's predicate holds (or a loop enters its body).
    True,
    /// Taken when the predicate fails (else, loop exit, no case matched).
    False,
    /// Re-enters a loop header.
    Back,
    /// Transfers an in-flight exception.
    Exceptional,
    /// Enters or leaves a lexical scope.
    Scoped,
    Normal,
}

impl EdgeRole {
    pub fn name(self) -> &'static str {
        match self {
            EdgeRole::True => "T",
            EdgeRole::False => "F",
            EdgeRole::Back => "back",
            EdgeRole::Exceptional => "exc",
            EdgeRole::Scoped => "scope",
            EdgeRole::Normal => "",
        }
    }

    fn style(self) -> Style {
        match self {
            EdgeRole::Back => Style::Bold,
            EdgeRole::Exceptional => Style::Dashed,
            EdgeRole::Scoped => Style::Dotted,
            _ => Style::Solid,
        }
    }

    fn color(self) -> Option<&'static str> {
        match self {
            EdgeRole::True => Some("darkgreen"),
            EdgeRole::False => Some("red"),
            EdgeRole::Back => Some("blue"),
            EdgeRole::Exceptional => Some("orange"),
            EdgeRole::Scoped => Some("gray"),
            EdgeRole::Normal => None,
        }
    }
}

/// Classify the `index`-th successor edge of `from`.
pub fn edge_role(from: &BasicBlock, index: usize, to: &BasicBlock) -> EdgeRole {
    // Headers are allocated before their bodies.
    if to.kind() == BlockKind::LoopHeader && to.id() < from.id() {
        return EdgeRole::Back;
    }
    match from.kind() {
        BlockKind::Try | BlockKind::Finally if index == 1 => EdgeRole::Exceptional,
        BlockKind::Terminated if from.has_attr(BlockAttrs::HAS_THROW) => EdgeRole::Exceptional,
        BlockKind::Block => EdgeRole::Scoped,
        _ if to.kind() == BlockKind::Join2 => EdgeRole::Scoped,
        BlockKind::LoopHeader | BlockKind::Branch | BlockKind::Case
        | BlockKind::Unconditional
            if from.predicate().is_some() || from.kind() == BlockKind::LoopHeader =>
        {
            match index {
                0 => EdgeRole::True,
                1 => EdgeRole::False,
                _ => EdgeRole::Normal,
            }
        }
        _ => EdgeRole::Normal,
    }
}

/// Write every function of `module` as one Graphviz digraph.
pub fn render<W: io::Write>(w: &mut W, module: &CfgModule, ast: &Ast) -> io::Result<()> {
    let mut graph = Graph::new(module, ast);
    for index in 0..module.functions().len() {
        graph.add_function(FunctionId(index as u32));
    }
    dot::render(&graph, w)
}

/// Render to a string; used by the driver and tests.
pub fn render_to_string(module: &CfgModule, ast: &Ast) -> io::Result<String> {
    let mut out = Vec::new();
    render(&mut out, module, ast)?;
    String::from_utf8(out).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

type Node = u32;
type Edge = (Node, Node, EdgeRole);

struct Graph<'a> {
    module: &'a CfgModule,
    ast: &'a Ast,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_labels: FxHashMap<Node, String>,
}

impl<'a> Graph<'a> {
    fn new(module: &'a CfgModule, ast: &'a Ast) -> Self {
        Graph {
            module,
            ast,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_labels: FxHashMap::default(),
        }
    }

    fn add_function(&mut self, function: FunctionId) {
        for block_ref in self.module.reachable_blocks(function) {
            self.add_block(function, block_ref);
        }
    }

    fn add_block(&mut self, function: FunctionId, block_ref: BlockRef) {
        let block = self.module.block(block_ref);
        let id = block.id();

        let mut statements = String::new();
        for &stmt in block.statements() {
            statements.push_str(&escape(&self.ast.describe(stmt)));
            statements.push_str("\\l");
        }
        let label = format!("{{{} bb{} {}|{}}}", function, id, block.kind(), statements);
        self.nodes.push(id);
        self.node_labels.insert(id, label);

        for (index, &succ) in block.successors().iter().enumerate() {
            let target = self.module.block(succ);
            self.edges
                .push((id, target.id(), edge_role(block, index, target)));
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('<', r"\<")
        .replace('>', r"\>")
        .replace('{', r"\{")
        .replace('}', r"\}")
        .replace('|', r"\|")
}

impl<'g> Labeller<'g, Node, Edge> for Graph<'_> {
    fn graph_id(&'g self) -> dot::Id<'g> {
        dot::Id::new("cfg").unwrap_or_else(|()| unreachable!("static graph id is valid"))
    }

    fn node_id(&'g self, n: &Node) -> dot::Id<'g> {
        dot::Id::new(format!("bb{}", n)).unwrap_or_else(|()| unreachable!("bbN is a valid id"))
    }

    fn node_label(&'g self, n: &Node) -> LabelText<'g> {
        let label = self
            .node_labels
            .get(n)
            .cloned()
            .unwrap_or_else(|| "?".to_string());
        LabelText::EscStr(label.into())
    }

    fn node_shape(&'g self, _: &Node) -> Option<LabelText<'g>> {
        Some(LabelText::LabelStr("record".into()))
    }

    fn edge_label(&'g self, e: &Edge) -> LabelText<'g> {
        LabelText::LabelStr(e.2.name().into())
    }

    fn edge_style(&'g self, e: &Edge) -> Style {
        e.2.style()
    }

    fn edge_color(&'g self, e: &Edge) -> Option<LabelText<'g>> {
        e.2.color().map(|color| LabelText::LabelStr(color.into()))
    }
}

impl<'g> GraphWalk<'g, Node, Edge> for Graph<'_> {
    fn nodes(&'g self) -> Nodes<'g, Node> {
        (&self.nodes).into()
    }

    fn edges(&'g self) -> Edges<'g, Edge> {
        (&self.edges).into()
    }

    fn source(&'g self, edge: &Edge) -> Node {
        edge.0
    }

    fn target(&'g self, edge: &Edge) -> Node {
        edge.1
    }
}
