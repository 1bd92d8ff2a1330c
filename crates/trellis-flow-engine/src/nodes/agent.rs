//! Agent node — invokes an external capability through the configured
//! [`AgentProvider`](crate::traits::AgentProvider).
//!
//! This is the only handler that performs a potentially slow external call,
//! so the invocation is bounded by a timeout: the node's own `timeout_ms`
//! when configured, the engine default otherwise.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::parse_config;
use crate::node_ctx::NodeCtx;
use crate::traits::NodeHandler;
use crate::types::{AgentConfig, Node, NodeError, NodeKind, NodeOutput};

/// Dispatches to the agent capability named by the node config and carries
/// the reply's token/cost usage into the execution aggregates.
pub struct AgentNode;

#[async_trait]
impl NodeHandler for AgentNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Agent
    }

    async fn run(&self, node: &Node, input: Value, ctx: &NodeCtx) -> Result<NodeOutput, NodeError> {
        let config: AgentConfig = parse_config(node)?;
        if config.capability.is_empty() {
            return Err(NodeError::Config {
                message: "agent node has an empty capability reference".into(),
            });
        }

        let timeout_ms = config.timeout_ms.unwrap_or_else(|| ctx.default_timeout_ms());
        let call = ctx
            .agents()
            .invoke(&config.capability, input, &config.options);

        match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(Ok(reply)) => Ok(NodeOutput {
                value: reply.output,
                tokens_used: reply.tokens_used,
                cost: reply.cost,
                branch: None,
            }),
            Ok(Err(err)) => Err(err),
            Err(_elapsed) => Err(NodeError::Timeout {
                elapsed_ms: timeout_ms,
            }),
        }
    }
}
