//! Runtime context handed to node handlers.

use std::sync::Arc;

use crate::traits::AgentProvider;

/// Capabilities available to a node handler during one invocation.
///
/// One `NodeCtx` is built per execution and shared across that execution's
/// node dispatches; it is cheap to clone.
#[derive(Clone)]
pub struct NodeCtx {
    execution_id: String,
    flow_id: String,
    agents: Arc<dyn AgentProvider>,
    default_timeout_ms: u64,
}

impl NodeCtx {
    pub fn new(
        execution_id: impl Into<String>,
        flow_id: impl Into<String>,
        agents: Arc<dyn AgentProvider>,
        default_timeout_ms: u64,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            flow_id: flow_id.into(),
            agents,
            default_timeout_ms,
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// The agent capability provider.
    pub fn agents(&self) -> &Arc<dyn AgentProvider> {
        &self.agents
    }

    /// Engine-wide bound applied to a capability call when the node config
    /// does not set its own.
    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }
}
