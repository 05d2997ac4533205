//! Shared fixtures and graph helpers for astcfg tests.

pub mod fixtures;
pub mod graph;

pub use fixtures::{write_ast_json, write_file};
pub use graph::{block_by_id, kind_of, shape, statements_of, succ_ids, FunctionShape};
