//! Builder configuration.
//!
//! All options default to the standard CFG shape; turning one off trades a
//! few extra blocks for a more uniform graph, which some consumers prefer.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgConfig {
    /// Traverse `{ ... }` blocks without block-scoped declarations or labels
    /// in place instead of giving them their own block and `Join2`.
    pub inline_unscoped_blocks: bool,
    /// Let a `default:` case block double as its body's entry block.
    pub reuse_default_case_block: bool,
    /// Set `HAS_CALL` when a call appears anywhere inside an appended
    /// statement, not only when the statement itself is a call.
    pub deep_call_scan: bool,
}

impl Default for CfgConfig {
    fn default() -> Self {
        CfgConfig {
            inline_unscoped_blocks: true,
            reuse_default_case_block: true,
            deep_call_scan: true,
        }
    }
}

impl CfgConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Load from a file, picking the format by extension (`.json` is JSON,
    /// anything else is read as YAML).
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_yaml_str(&source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CfgConfig::default();
        assert!(config.inline_unscoped_blocks);
        assert!(config.reuse_default_case_block);
        assert!(config.deep_call_scan);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = CfgConfig::from_yaml_str("reuse_default_case_block: false\n").unwrap();
        assert!(!config.reuse_default_case_block);
        assert!(config.inline_unscoped_blocks);
        assert!(config.deep_call_scan);
    }

    #[test]
    fn test_json() {
        let config = CfgConfig::from_json_str(r#"{ "deep_call_scan": false }"#).unwrap();
        assert!(!config.deep_call_scan);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(CfgConfig::from_yaml_str("inline_unscoped_blocks: [1, 2").is_err());
    }
}
