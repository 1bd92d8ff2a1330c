//! Transform node — reshapes its input with a selection expression.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::parse_config;
use crate::expression::lookup_path;
use crate::node_ctx::NodeCtx;
use crate::traits::NodeHandler;
use crate::types::{Node, NodeError, NodeKind, NodeOutput, TransformConfig};

/// Applies the configured `expression` to the input:
/// - `"."` is the identity;
/// - a dot path (`result.items`) selects a value, yielding `null` when the
///   path does not resolve (a missing field is data, not a failure);
/// - `"{out: result.score, label: ."}` builds an object from path
///   selections (`.` inside a template selects the whole input).
pub struct TransformNode;

#[async_trait]
impl NodeHandler for TransformNode {
    fn kind(&self) -> NodeKind {
        NodeKind::Transform
    }

    async fn run(&self, node: &Node, input: Value, _ctx: &NodeCtx) -> Result<NodeOutput, NodeError> {
        let config: TransformConfig = parse_config(node)?;
        let expression = config.expression.trim();
        if expression.is_empty() {
            return Err(NodeError::Config {
                message: "transform node has an empty expression".into(),
            });
        }

        Ok(NodeOutput::value(apply(expression, &input)?))
    }
}

fn apply(expression: &str, input: &Value) -> Result<Value, NodeError> {
    if expression == "." {
        return Ok(input.clone());
    }
    if let Some(body) = expression
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        return build_object(body, input);
    }
    Ok(select(expression, input))
}

fn select(path: &str, input: &Value) -> Value {
    if path == "." {
        return input.clone();
    }
    lookup_path(input, path).cloned().unwrap_or(Value::Null)
}

/// Parse `key: path, key2: path2` pairs into an object of selections.
fn build_object(body: &str, input: &Value) -> Result<Value, NodeError> {
    let mut out = Map::new();
    for pair in body.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, path) = pair.split_once(':').ok_or_else(|| NodeError::Config {
            message: format!("invalid transform mapping '{pair}': expected 'key: path'"),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(NodeError::Config {
                message: format!("invalid transform mapping '{pair}': empty key"),
            });
        }
        out.insert(key.to_string(), select(path.trim(), input));
    }
    Ok(Value::Object(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::test_support::ctx;
    use serde_json::json;

    fn node(expression: &str) -> Node {
        Node::new("t1", NodeKind::Transform, "Reshape")
            .with_config(json!({ "expression": expression }))
    }

    fn payload() -> Value {
        json!({"result": {"score": 0.7, "items": [1, 2]}, "source": "crawler"})
    }

    #[tokio::test]
    async fn identity() {
        let out = TransformNode.run(&node("."), payload(), &ctx()).await.unwrap();
        assert_eq!(out.value, payload());
    }

    #[tokio::test]
    async fn dot_path_selection() {
        let out = TransformNode
            .run(&node("result.items"), payload(), &ctx())
            .await
            .unwrap();
        assert_eq!(out.value, json!([1, 2]));
    }

    #[tokio::test]
    async fn unresolved_path_yields_null() {
        let out = TransformNode
            .run(&node("result.missing.deeper"), payload(), &ctx())
            .await
            .unwrap();
        assert_eq!(out.value, Value::Null);
    }

    #[tokio::test]
    async fn object_template() {
        let out = TransformNode
            .run(&node("{score: result.score, origin: source, all: .}"), payload(), &ctx())
            .await
            .unwrap();
        assert_eq!(
            out.value,
            json!({"score": 0.7, "origin": "crawler", "all": payload()})
        );
    }

    #[tokio::test]
    async fn malformed_template_is_config_error() {
        let err = TransformNode
            .run(&node("{score result.score}"), payload(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Config { .. }));
    }

    #[tokio::test]
    async fn empty_expression_is_config_error() {
        let err = TransformNode
            .run(&node("   "), payload(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Config { .. }));
    }
}
