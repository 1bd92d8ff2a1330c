//! Output node — renders the final output of an execution.

use async_trait::async_trait;
use serde_json::Value;

use super::parse_config;
use crate::node_ctx::NodeCtx;
use crate::traits::NodeHandler;
use crate::types::{Node, NodeError, NodeKind, NodeOutput, OutputConfig};

/// Terminal node of a flow. `output_type` `"json"` passes the value through
/// unchanged; `"text"` renders it to a string. Reaching an output node
/// completes the execution with this node's value.
pub struct OutputNode;

#[async_trait]
impl NodeHandler for OutputNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Output
    }

    async fn run(&self, node: &Node, input: Value, _ctx: &NodeCtx) -> Result<NodeOutput, NodeError> {
        let config: OutputConfig = parse_config(node)?;

        let value = match config.output_type.as_str() {
            "json" => input,
            "text" => match input {
                Value::String(s) => Value::String(s),
                other => Value::String(serde_json::to_string_pretty(&other).map_err(|e| {
                    NodeError::Fatal {
                        message: format!("failed to render output as text: {e}"),
                    }
                })?),
            },
            other => {
                return Err(NodeError::Config {
                    message: format!("unknown output type: {other}"),
                });
            }
        };

        Ok(NodeOutput::value(value))
    }
}
