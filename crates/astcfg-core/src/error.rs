use crate::ast::NodeId;
use thiserror::Error;

/// Errors raised while loading an AST or building its CFG.
///
/// The builder assumes a validated AST, so every build-time variant indicates
/// a bug in an earlier pipeline stage. Drivers should report them as internal
/// compiler errors rather than source diagnostics.
#[derive(Debug, Error)]
pub enum CfgError {
    #[error("malformed AST: node {0} does not exist")]
    MissingNode(NodeId),

    #[error("malformed AST: node {0} is its own ancestor")]
    CyclicNode(NodeId),

    #[error("malformed AST: expected {expected} at node {node}, found {found}")]
    UnexpectedNode {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unresolved break target{}", label_suffix(.label))]
    UnresolvedBreak { label: Option<String> },

    #[error("unresolved continue target{}", label_suffix(.label))]
    UnresolvedContinue { label: Option<String> },

    #[error("throw target stack is empty while building function at node {0}")]
    EmptyThrowTargets(NodeId),

    #[error("node {0} is not a function-like node")]
    NotAFunction(NodeId),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn label_suffix(label: &Option<String>) -> String {
    match label {
        Some(label) => format!(" for label '{}'", label),
        None => String::new(),
    }
}

/// Result type for CFG operations.
pub type Result<T> = std::result::Result<T, CfgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_messages_mention_label() {
        let err = CfgError::UnresolvedBreak {
            label: Some("outer".to_string()),
        };
        assert_eq!(err.to_string(), "unresolved break target for label 'outer'");

        let err = CfgError::UnresolvedContinue { label: None };
        assert_eq!(err.to_string(), "unresolved continue target");
    }

    #[test]
    fn test_missing_node_message() {
        let err = CfgError::MissingNode(NodeId(7));
        assert_eq!(err.to_string(), "malformed AST: node #7 does not exist");
    }
}
