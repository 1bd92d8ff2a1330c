//! Input node — projects the declared fields out of the execution input.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::parse_config;
use crate::node_ctx::NodeCtx;
use crate::traits::NodeHandler;
use crate::types::{InputConfig, Node, NodeError, NodeKind, NodeOutput};

/// Entry node of a flow. Collects the fields declared in its config from
/// the run input, applying declared defaults. A missing required field with
/// no default fails the node.
pub struct InputNode;

#[async_trait]
impl NodeHandler for InputNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Input
    }

    async fn run(&self, node: &Node, input: Value, _ctx: &NodeCtx) -> Result<NodeOutput, NodeError> {
        let config: InputConfig = parse_config(node)?;

        let mut collected = Map::new();
        for field in &config.fields {
            match input.get(&field.name) {
                Some(value) => {
                    collected.insert(field.name.clone(), value.clone());
                }
                None => match &field.default {
                    Some(default) => {
                        collected.insert(field.name.clone(), default.clone());
                    }
                    None if field.required => {
                        return Err(NodeError::Fatal {
                            message: format!("missing required input field: {}", field.name),
                        });
                    }
                    None => {}
                },
            }
        }

        Ok(NodeOutput::value(Value::Object(collected)))
    }
}
