//! Plain-text CFG listing for logs, snapshots and the driver.
//!
//! ```text
//! F0 #5:Module(m) entry=bb1 exit=bb2 last=5
//!   bb1 Unconditional
//!     -> bb3
//!   bb3 Branch pred=#0:Identifier(c) aux=#4:CondBranch
//!     | #0:Identifier(c)
//!     -> bb4 bb5
//! ```
//!
//! Only blocks reachable from the entry (plus the exit) are listed, in id
//! order.

use super::function::FunctionId;
use super::CfgModule;
use crate::ast::Ast;
use std::fmt;

/// Text listing of one function.
pub fn render_function(module: &CfgModule, ast: &Ast, function: FunctionId) -> String {
    FunctionDump {
        module,
        ast,
        function,
    }
    .to_string()
}

/// Text listing of every function, separated by blank lines.
pub fn render_module(module: &CfgModule, ast: &Ast) -> String {
    ModuleDump { module, ast }.to_string()
}

pub struct ModuleDump<'a> {
    pub module: &'a CfgModule,
    pub ast: &'a Ast,
}

impl fmt::Display for ModuleDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..self.module.functions().len() {
            if index > 0 {
                writeln!(f)?;
            }
            let dump = FunctionDump {
                module: self.module,
                ast: self.ast,
                function: FunctionId(index as u32),
            };
            write!(f, "{}", dump)?;
        }
        Ok(())
    }
}

pub struct FunctionDump<'a> {
    pub module: &'a CfgModule,
    pub ast: &'a Ast,
    pub function: FunctionId,
}

impl fmt::Display for FunctionDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(record) = self.module.function(self.function) else {
            return writeln!(f, "{} <missing>", self.function);
        };
        let id_of = |block| self.module.block(block).id();

        write!(
            f,
            "{} {} entry=bb{} exit=bb{} last={}",
            self.function,
            self.ast.describe(record.node()),
            id_of(record.entry()),
            id_of(record.exit()),
            record.last_block_id()
        )?;
        if !record.nested().is_empty() {
            let nested: Vec<String> = record.nested().iter().map(ToString::to_string).collect();
            write!(f, " nested=[{}]", nested.join(", "))?;
        }
        writeln!(f)?;

        let mut blocks = self.module.reachable_blocks(self.function);
        blocks.sort_by_key(|&block| id_of(block));

        for block_ref in blocks {
            let block = self.module.block(block_ref);
            write!(f, "  bb{} {}", block.id(), block.kind())?;
            if !block.attrs().is_empty() {
                write!(f, " [{}]", block.attrs().names().join(" "))?;
            }
            if let Some(pred) = block.predicate() {
                write!(f, " pred={}", self.ast.describe(pred))?;
            }
            if let Some(aux) = block.aux_node() {
                write!(f, " aux={}", self.ast.describe(aux))?;
            }
            writeln!(f)?;

            for &stmt in block.statements() {
                writeln!(f, "    | {}", self.ast.describe(stmt))?;
            }
            if !block.successors().is_empty() {
                let succs: Vec<String> = block
                    .successors()
                    .iter()
                    .map(|&succ| format!("bb{}", id_of(succ)))
                    .collect();
                writeln!(f, "    -> {}", succs.join(" "))?;
            }
        }
        Ok(())
    }
}
