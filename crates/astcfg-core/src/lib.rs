//! Control-flow-graph construction for a language-agnostic compiler middle-end.
//!
//! ```
//! use astcfg_core::{ast::AstBuilder, build_module, validate};
//!
//! let mut b = AstBuilder::new();
//! let c = b.ident("c");
//! let a = b.ident("a");
//! let stmt = b.if_(c, vec![a], None);
//! let ast = b.finish_module("m", vec![stmt]);
//!
//! let module = build_module(&ast).unwrap();
//! assert!(validate(&module, &ast).is_empty());
//! ```

pub mod ast;
pub mod cfg;
pub mod config;
pub mod error;

pub use ast::{Ast, AstBuilder, NodeId, NodeKind};
pub use cfg::{
    build_module, validate, BasicBlock, BlockAttrs, BlockKind, BlockRef, CfgBuilder, CfgFunction,
    CfgModule, FunctionId, Violation,
};
pub use config::CfgConfig;
pub use error::{CfgError, Result};
