//! Foundational types for the flow execution model.
//!
//! Every type here is `Serialize + Deserialize + Debug + Clone`. Map fields
//! use `BTreeMap` (never `HashMap`) so serialized output is deterministic.
//! Enums that cross the wire are `#[non_exhaustive]` so adding variants is
//! never a breaking change for downstream consumers.

pub mod execution;
pub mod flow;

pub use execution::*;
pub use flow::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(crate) fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Node handler results
// ---------------------------------------------------------------------------

/// The result of a single node handler invocation.
///
/// `branch` is set only by condition handlers: it names the node id the walk
/// should continue at, overriding the node's static `next` reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct NodeOutput {
    pub value: Value,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl NodeOutput {
    /// A plain output value with no usage and no branch decision.
    pub fn value(value: Value) -> Self {
        Self {
            value,
            tokens_used: 0,
            cost: 0.0,
            branch: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Node errors
// ---------------------------------------------------------------------------

/// Structured errors returned by node execution. Serializable so a failure
/// can be captured verbatim into an execution's `error_details`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case", tag = "kind")]
#[non_exhaustive]
pub enum NodeError {
    Fatal { message: String },
    Timeout { elapsed_ms: u64 },
    Config { message: String },
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal { message } => write!(f, "fatal: {message}"),
            Self::Timeout { elapsed_ms } => write!(f, "timeout after {elapsed_ms}ms"),
            Self::Config { message } => write!(f, "config: {message}"),
        }
    }
}

impl std::error::Error for NodeError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_error_display() {
        assert_eq!(
            NodeError::Fatal {
                message: "boom".into()
            }
            .to_string(),
            "fatal: boom"
        );
        assert_eq!(
            NodeError::Timeout { elapsed_ms: 5000 }.to_string(),
            "timeout after 5000ms"
        );
        assert_eq!(
            NodeError::Config {
                message: "bad field".into()
            }
            .to_string(),
            "config: bad field"
        );
    }

    #[test]
    fn node_error_serializes_with_kind_tag() {
        let err = NodeError::Timeout { elapsed_ms: 250 };
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v, json!({"kind": "timeout", "elapsed_ms": 250}));
    }

    #[test]
    fn node_output_value_defaults() {
        let out = NodeOutput::value(json!({"x": 1}));
        assert_eq!(out.tokens_used, 0);
        assert_eq!(out.cost, 0.0);
        assert!(out.branch.is_none());
    }
}
