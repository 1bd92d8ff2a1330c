//! Built-in node handlers, one per node kind.
//!
//! Dispatch is by type tag: the orchestrator looks the handler up in a
//! registry keyed by [`NodeKind`]. [`default_handlers`] builds the registry
//! with all five built-ins.

mod agent;
mod condition;
mod input;
mod output;
mod transform;

pub use agent::AgentNode;
pub use condition::ConditionNode;
pub use input::InputNode;
pub use output::OutputNode;
pub use transform::TransformNode;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::traits::NodeHandler;
use crate::types::{Node, NodeError, NodeKind};

/// Registry with the five built-in handlers registered.
pub fn default_handlers() -> BTreeMap<NodeKind, Arc<dyn NodeHandler>> {
    let handlers: Vec<Arc<dyn NodeHandler>> = vec![
        Arc::new(InputNode),
        Arc::new(AgentNode),
        Arc::new(OutputNode),
        Arc::new(ConditionNode),
        Arc::new(TransformNode),
    ];
    handlers.into_iter().map(|h| (h.kind(), h)).collect()
}

/// Deserialize a node's kind-specific config, mapping failures to
/// [`NodeError::Config`].
pub(crate) fn parse_config<T: DeserializeOwned>(node: &Node) -> Result<T, NodeError> {
    serde_json::from_value(node.config.clone()).map_err(|e| NodeError::Config {
        message: format!("invalid {} node config: {e}", node.kind),
    })
}
