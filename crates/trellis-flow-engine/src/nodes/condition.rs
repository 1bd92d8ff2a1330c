//! Condition node — routes the walk by evaluating a predicate.
//!
//! The node performs no data transformation: its input passes through
//! unchanged so downstream nodes see the same payload. The routing decision
//! is surfaced through [`NodeOutput::branch`], which the orchestrator
//! follows instead of the node's static `next`.

use async_trait::async_trait;
use serde_json::Value;

use super::parse_config;
use crate::expression;
use crate::node_ctx::NodeCtx;
use crate::traits::NodeHandler;
use crate::types::{ConditionConfig, Node, NodeError, NodeKind, NodeOutput};

/// Evaluates `predicate` against the node input and picks the `on_true` or
/// `on_false` branch target. A `None` target ends the walk (the execution
/// completes with the passthrough value).
pub struct ConditionNode;

#[async_trait]
impl NodeHandler for ConditionNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Condition
    }

    async fn run(&self, node: &Node, input: Value, _ctx: &NodeCtx) -> Result<NodeOutput, NodeError> {
        let config: ConditionConfig = parse_config(node)?;

        let outcome =
            expression::evaluate(&config.predicate, &input).map_err(|e| NodeError::Config {
                message: format!("invalid predicate '{}': {e}", config.predicate),
            })?;

        let branch = if outcome {
            config.on_true
        } else {
            config.on_false
        };

        Ok(NodeOutput {
            value: input,
            tokens_used: 0,
            cost: 0.0,
            branch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::ctx;
    use serde_json::json;

    fn node(predicate: &str) -> Node {
        Node::new("c1", NodeKind::Condition, "Branch").with_config(json!({
            "predicate": predicate,
            "on_true": "yes",
            "on_false": "no"
        }))
    }

    #[tokio::test]
    async fn true_predicate_picks_on_true() {
        let out = ConditionNode
            .run(&node("score > 0.5"), json!({"score": 0.9}), &ctx())
            .await
            .unwrap();
        assert_eq!(out.branch.as_deref(), Some("yes"));
        assert_eq!(out.value, json!({"score": 0.9}));
    }

    #[tokio::test]
    async fn false_predicate_picks_on_false() {
        let out = ConditionNode
            .run(&node("score > 0.5"), json!({"score": 0.1}), &ctx())
            .await
            .unwrap();
        assert_eq!(out.branch.as_deref(), Some("no"));
    }

    #[tokio::test]
    async fn missing_branch_target_ends_walk() {
        let node = Node::new("c1", NodeKind::Condition, "Branch")
            .with_config(json!({"predicate": "done == true", "on_false": "retry"}));
        let out = ConditionNode
            .run(&node, json!({"done": true}), &ctx())
            .await
            .unwrap();
        assert!(out.branch.is_none());
    }

    #[tokio::test]
    async fn invalid_predicate_is_config_error() {
        let err = ConditionNode
            .run(&node("score >"), json!({"score": 1}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Config { .. }));
    }

    #[tokio::test]
    async fn input_passes_through_untouched() {
        let payload = json!({"nested": {"deep": [1, 2, 3]}, "flag": false});
        let out = ConditionNode
            .run(&node("flag"), payload.clone(), &ctx())
            .await
            .unwrap();
        assert_eq!(out.value, payload);
    }
}
