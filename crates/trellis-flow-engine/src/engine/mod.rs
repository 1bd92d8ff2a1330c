//! Engine facade — the single entry point for running flows.
//!
//! The engine loads flows, validates them, enforces the execution state
//! machine (`pending → running → {completed | failed | cancelled}`), spawns
//! one orchestrator task per run, and exposes the read/streaming surfaces.
//! Construct via [`Engine::builder()`].
//!
//! ```rust,ignore
//! let engine = Engine::builder()
//!     .agents(Arc::new(my_provider))
//!     .build();
//!
//! let id = engine
//!     .start("my-flow", json!({"url": "https://example.com"}), TriggerKind::Api, None)
//!     .await?;
//! let mut events = engine.subscribe(&id).unwrap();
//! ```

mod builder;
pub mod error;

pub use builder::EngineBuilder;
pub use error::EngineError;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::emitter::ProgressEmitter;
use crate::events::ExecutionEvent;
use crate::executor::{run_execution, RunContext};
use crate::recorder::ExecutionRecorder;
use crate::stats::{compute_stats, ExecutionStats};
use crate::traits::{AgentProvider, ExecutionFilter, ExecutionStore, FlowStore, NodeHandler};
use crate::types::{
    ExecutionStatus, FlowExecution, LogLevel, NodeExecution, NodeExecutionUpdate, NodeKind,
    TriggerKind,
};
use crate::validate::validate_nodes;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Engine tuning. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Bound on each agent capability call, in milliseconds, when the node
    /// config does not set its own. Default: 30 000 (30 s).
    #[serde(default = "default_agent_timeout_ms")]
    pub agent_timeout_ms: u64,
    /// Capacity of each per-execution event channel. Observers further
    /// behind than this lose events instead of blocking the engine.
    /// Default: 256.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            agent_timeout_ms: default_agent_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

fn default_agent_timeout_ms() -> u64 {
    30_000
}

fn default_event_capacity() -> usize {
    256
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The assembled engine runtime. All internals are `Arc`-wrapped, so the
/// engine itself is cheap to share behind an `Arc`.
pub struct Engine {
    pub(super) flow_store: Arc<dyn FlowStore>,
    pub(super) execution_store: Arc<dyn ExecutionStore>,
    pub(super) agents: Arc<dyn AgentProvider>,
    pub(super) handlers: Arc<BTreeMap<NodeKind, Arc<dyn NodeHandler>>>,
    pub(super) recorder: Arc<ExecutionRecorder>,
    pub(super) emitter: Arc<ProgressEmitter>,
    pub(super) config: EngineConfig,
    /// Orchestrator tasks by execution id, joinable via [`Engine::wait`].
    pub(super) tasks: tokio::sync::Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Engine {
    /// Create a new [`EngineBuilder`].
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start an execution of a flow.
    ///
    /// Preconditions checked synchronously, in order: the flow exists
    /// (`FlowNotFound`), it is active (`NotActive`), and its node graph
    /// validates (`InvalidDefinition` — no record is created). On success
    /// the execution record is created in `Running`, an initial info log is
    /// appended, and the graph walk proceeds asynchronously. Returns the
    /// new execution id.
    pub async fn start(
        &self,
        flow_id: &str,
        input: Value,
        triggered_by: TriggerKind,
        trigger_data: Option<Value>,
    ) -> Result<String, EngineError> {
        self.start_inner(flow_id, input, triggered_by, trigger_data, None)
            .await
    }

    async fn start_inner(
        &self,
        flow_id: &str,
        input: Value,
        triggered_by: TriggerKind,
        trigger_data: Option<Value>,
        retry_of: Option<String>,
    ) -> Result<String, EngineError> {
        let flow = self
            .flow_store
            .get(flow_id)
            .await?
            .ok_or_else(|| EngineError::FlowNotFound {
                flow_id: flow_id.to_string(),
            })?;

        if !flow.is_active {
            return Err(EngineError::NotActive {
                flow_id: flow_id.to_string(),
            });
        }

        let report = validate_nodes(&flow.nodes);
        if !report.valid {
            return Err(EngineError::InvalidDefinition {
                errors: report.errors,
            });
        }
        for warning in &report.warnings {
            tracing::debug!(flow_id, warning = %warning, "flow validation warning");
        }

        let mut execution = FlowExecution::new(&flow.id, input.clone(), triggered_by, trigger_data);
        execution.retry_of = retry_of;
        let execution_id = execution.id.clone();

        self.recorder.create(execution).await?;
        self.recorder
            .add_log(
                &execution_id,
                LogLevel::Info,
                format!("execution started for flow '{}'", flow.name),
                None,
            )
            .await?;

        let ctx = RunContext {
            execution_id: execution_id.clone(),
            flow,
            input,
            recorder: Arc::clone(&self.recorder),
            handlers: Arc::clone(&self.handlers),
            agents: Arc::clone(&self.agents),
            config: self.config.clone(),
        };
        let handle = tokio::spawn(run_execution(ctx));

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(execution_id.clone(), handle);

        Ok(execution_id)
    }

    /// Cancel a pending or running execution; `IllegalTransition` from any
    /// other state. The orchestrator observes the flipped status
    /// cooperatively — an in-flight agent call is not interrupted, its
    /// result is discarded.
    pub async fn cancel(&self, execution_id: &str) -> Result<(), EngineError> {
        self.recorder.cancel(execution_id).await
    }

    /// Record the final output and metrics of a running execution.
    /// Single-shot; legal only from `Running`.
    pub async fn complete(
        &self,
        execution_id: &str,
        output: Option<Value>,
        tokens_used: u64,
        cost: f64,
    ) -> Result<(), EngineError> {
        self.recorder
            .complete(execution_id, output, tokens_used, cost)
            .await
    }

    /// Mark a running execution as failed.
    pub async fn fail(
        &self,
        execution_id: &str,
        error: impl Into<String>,
        error_details: Option<Value>,
    ) -> Result<(), EngineError> {
        self.recorder.fail(execution_id, error, error_details).await
    }

    /// Retry a failed execution: reads the original's flow, input, and
    /// trigger, and starts a brand-new independent execution referencing it
    /// via `retry_of`. The original record is never resurrected.
    pub async fn retry(&self, execution_id: &str) -> Result<String, EngineError> {
        let original = self
            .execution_store
            .get(execution_id)
            .await?
            .ok_or_else(|| EngineError::ExecutionNotFound {
                id: execution_id.to_string(),
            })?;

        if original.status != ExecutionStatus::Failed {
            return Err(EngineError::IllegalTransition {
                status: original.status,
                operation: "retry",
            });
        }

        self.start_inner(
            &original.flow_id,
            original.input.clone(),
            original.triggered_by,
            original.trigger_data.clone(),
            Some(original.id.clone()),
        )
        .await
    }

    // -- control surface passthroughs ---------------------------------------

    /// Append a log entry to a running execution.
    pub async fn add_log(
        &self,
        execution_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        node_id: Option<String>,
    ) -> Result<(), EngineError> {
        self.recorder
            .add_log(execution_id, level, message, node_id)
            .await
    }

    /// Merge a node-state update into a running execution.
    pub async fn update_node(
        &self,
        execution_id: &str,
        node_id: &str,
        update: NodeExecutionUpdate,
    ) -> Result<NodeExecution, EngineError> {
        self.recorder
            .update_node(execution_id, node_id, update)
            .await
    }

    // -- reads ---------------------------------------------------------------

    /// Fetch an execution: live state while running, the stored record once
    /// finished.
    pub async fn get_execution(&self, execution_id: &str) -> Result<FlowExecution, EngineError> {
        self.recorder.snapshot(execution_id).await
    }

    /// All executions of a flow, most recently started first.
    pub async fn find_by_flow_id(
        &self,
        flow_id: &str,
    ) -> Result<Vec<FlowExecution>, EngineError> {
        Ok(self
            .execution_store
            .list(&ExecutionFilter::for_flow(flow_id))
            .await?)
    }

    /// All currently running executions.
    pub async fn find_running(&self) -> Result<Vec<FlowExecution>, EngineError> {
        self.find_by_status(ExecutionStatus::Running).await
    }

    /// The `limit` most recently started executions across all flows.
    pub async fn find_recent(&self, limit: usize) -> Result<Vec<FlowExecution>, EngineError> {
        Ok(self
            .execution_store
            .list(&ExecutionFilter {
                limit: Some(limit),
                ..Default::default()
            })
            .await?)
    }

    /// All executions in a given status.
    pub async fn find_by_status(
        &self,
        status: ExecutionStatus,
    ) -> Result<Vec<FlowExecution>, EngineError> {
        Ok(self
            .execution_store
            .list(&ExecutionFilter::with_status(status))
            .await?)
    }

    /// Aggregate stats over one flow's executions.
    pub async fn get_stats(&self, flow_id: &str) -> Result<ExecutionStats, EngineError> {
        let executions = self.find_by_flow_id(flow_id).await?;
        Ok(compute_stats(&executions))
    }

    /// Aggregate stats over every execution of every flow.
    pub async fn get_global_stats(&self) -> Result<ExecutionStats, EngineError> {
        let executions = self
            .execution_store
            .list(&ExecutionFilter::default())
            .await?;
        Ok(compute_stats(&executions))
    }

    // -- streaming -----------------------------------------------------------

    /// Subscribe to the live event feed of an execution. `None` once the
    /// execution has finished (or never existed). Late subscribers miss
    /// earlier events.
    pub fn subscribe(&self, execution_id: &str) -> Option<broadcast::Receiver<ExecutionEvent>> {
        self.emitter.subscribe(execution_id)
    }

    // -- embedding support ---------------------------------------------------

    /// Await the orchestrator task of an execution, if one is still
    /// tracked. Useful for embedders and tests that need a run to settle.
    pub async fn wait(&self, execution_id: &str) {
        let handle = self.tasks.lock().await.remove(execution_id);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Access the flow store (for the surrounding application layer).
    pub fn flow_store(&self) -> &Arc<dyn FlowStore> {
        &self.flow_store
    }

    /// Access the execution store.
    pub fn execution_store(&self) -> &Arc<dyn ExecutionStore> {
        &self.execution_store
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
