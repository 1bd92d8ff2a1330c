//! Trait seams for every external collaborator.
//!
//! Durable storage, the agent capability, and the node handlers are all
//! consumed through async traits. In-memory defaults live in
//! [`defaults`](crate::defaults). Adding a method to any trait requires a
//! default implementation to preserve backward compatibility.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ExecutionStoreError, FlowStoreError};
use crate::node_ctx::NodeCtx;
use crate::types::{ExecutionStatus, Flow, FlowExecution, Node, NodeError, NodeKind, NodeOutput};

// ---------------------------------------------------------------------------
// FlowStore
// ---------------------------------------------------------------------------

/// Persistence for flow definitions.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Load a flow by id. Returns `None` if unknown.
    async fn get(&self, flow_id: &str) -> Result<Option<Flow>, FlowStoreError>;

    /// Create or replace a flow definition.
    async fn put(&self, flow: Flow) -> Result<(), FlowStoreError>;

    /// List all stored flows.
    async fn list(&self) -> Result<Vec<Flow>, FlowStoreError>;
}

// ---------------------------------------------------------------------------
// ExecutionStore
// ---------------------------------------------------------------------------

/// Persistence for execution records.
///
/// Implementations must provide strong read-after-write per execution id:
/// a `get` after a returned `update` sees that update.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a brand-new execution record.
    async fn create(&self, execution: &FlowExecution) -> Result<(), ExecutionStoreError>;

    /// Replace the stored record for an existing execution.
    async fn update(&self, execution: &FlowExecution) -> Result<(), ExecutionStoreError>;

    /// Fetch an execution by id. Returns `None` if unknown.
    async fn get(&self, execution_id: &str) -> Result<Option<FlowExecution>, ExecutionStoreError>;

    /// List executions matching the filter, most recently started first.
    async fn list(&self, filter: &ExecutionFilter) -> Result<Vec<FlowExecution>, ExecutionStoreError>;
}

/// Filter criteria for listing executions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub flow_id: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub limit: Option<usize>,
}

impl ExecutionFilter {
    pub fn for_flow(flow_id: impl Into<String>) -> Self {
        Self {
            flow_id: Some(flow_id.into()),
            ..Self::default()
        }
    }

    pub fn with_status(status: ExecutionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// AgentProvider
// ---------------------------------------------------------------------------

/// The external agent capability consumed by `agent` nodes.
///
/// A capability reference is an opaque identifier naming an external
/// agent/LLM configuration. Implementations convert the input to their
/// provider-specific request, make the (potentially slow) call, and report
/// usage back. The engine bounds each invocation with a timeout; providers
/// do not need to enforce one themselves.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Invoke a capability with the node's input and config options.
    async fn invoke(
        &self,
        capability: &str,
        input: Value,
        options: &Value,
    ) -> Result<AgentReply, NodeError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// A successful agent invocation: output plus usage metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct AgentReply {
    pub output: Value,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
}

// ---------------------------------------------------------------------------
// NodeHandler
// ---------------------------------------------------------------------------

/// One handler per node kind, selected by type tag (never inheritance).
/// The orchestrator calls [`run()`](Self::run) with the node definition,
/// the resolved input, and a [`NodeCtx`] providing runtime capabilities.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// The node kind this handler executes.
    fn kind(&self) -> NodeKind;

    /// Execute the node against its input.
    async fn run(&self, node: &Node, input: Value, ctx: &NodeCtx) -> Result<NodeOutput, NodeError>;
}
