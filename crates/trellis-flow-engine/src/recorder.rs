//! Per-execution state recording.
//!
//! The recorder is the sole mutator of a live execution's `logs`,
//! `node_executions`, `current_node_id`, aggregates, and status. All writes
//! for one execution serialize through a per-execution async mutex held
//! across mutate → persist → emit, so interleaved completions can never
//! corrupt ordering and observers see events in commit order.
//!
//! The node list is an append-only arena with a `node_id → index` map on
//! the side, keeping merge-by-node-id O(1) as executions grow long.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::emitter::ProgressEmitter;
use crate::engine::EngineError;
use crate::events::ExecutionEvent;
use crate::traits::ExecutionStore;
use crate::types::{
    ExecutionStatus, FlowExecution, LogEntry, LogLevel, NodeExecution, NodeExecutionUpdate,
    NodeRunStatus,
};

struct LiveExecution {
    record: FlowExecution,
    node_index: HashMap<String, usize>,
}

/// Single writer for all live executions.
///
/// Terminal transitions (`complete`, `fail`, `cancel`) are total over
/// (state, operation): they either mutate atomically into the new state or
/// reject with `IllegalTransition` without touching the record.
pub struct ExecutionRecorder {
    store: Arc<dyn ExecutionStore>,
    emitter: Arc<ProgressEmitter>,
    live: parking_lot::RwLock<HashMap<String, Arc<Mutex<LiveExecution>>>>,
}

impl ExecutionRecorder {
    pub fn new(store: Arc<dyn ExecutionStore>, emitter: Arc<ProgressEmitter>) -> Self {
        Self {
            store,
            emitter,
            live: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    /// Register a fresh execution: persist it, open its event channel, and
    /// emit `Started`.
    pub async fn create(&self, execution: FlowExecution) -> Result<(), EngineError> {
        self.store.create(&execution).await?;

        let started = ExecutionEvent::Started {
            execution_id: execution.id.clone(),
            flow_id: execution.flow_id.clone(),
            input: execution.input.clone(),
            triggered_by: execution.triggered_by,
            timestamp: execution.started_at,
        };

        let id = execution.id.clone();
        self.live.write().insert(
            id.clone(),
            Arc::new(Mutex::new(LiveExecution {
                record: execution,
                node_index: HashMap::new(),
            })),
        );
        self.emitter.register(&id);
        self.emitter.emit(started);
        Ok(())
    }

    /// Append a log entry to a live execution.
    pub async fn add_log(
        &self,
        execution_id: &str,
        level: LogLevel,
        message: impl Into<String>,
        node_id: Option<String>,
    ) -> Result<(), EngineError> {
        let entry = self.live_entry(execution_id, "log").await?;
        let mut live = entry.lock().await;
        guard_writable(&live.record, "log")?;

        let log = LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            node_id,
        };
        live.record.logs.push(log.clone());
        self.persist(&live.record).await?;
        self.emitter.emit(ExecutionEvent::Log {
            execution_id: execution_id.to_string(),
            entry: log,
        });
        Ok(())
    }

    /// Merge a partial update onto the node's recorded state, appending a
    /// new entry only for a node id not seen before. Calling twice with the
    /// same node id never produces two entries, which makes replayed
    /// updates idempotent.
    ///
    /// A `Running` update publishes the node as the execution's
    /// `current_node_id`.
    pub async fn update_node(
        &self,
        execution_id: &str,
        node_id: &str,
        update: NodeExecutionUpdate,
    ) -> Result<NodeExecution, EngineError> {
        let entry = self.live_entry(execution_id, "update node").await?;
        let mut live = entry.lock().await;
        guard_writable(&live.record, "update node")?;

        let node = if let Some(&index) = live.node_index.get(node_id) {
            let node = &mut live.record.node_executions[index];
            if let Some(status) = update.status {
                node.status = status;
            }
            if let Some(input) = update.input {
                node.input = input;
            }
            if let Some(output) = update.output {
                node.output = Some(output);
            }
            if let Some(error) = update.error {
                node.error = Some(error);
            }
            if let Some(completed_at) = update.completed_at {
                node.completed_at = Some(completed_at);
            }
            node.clone()
        } else {
            let node = NodeExecution {
                node_id: node_id.to_string(),
                status: update.status.unwrap_or(NodeRunStatus::Running),
                input: update.input.unwrap_or(Value::Null),
                output: update.output,
                error: update.error,
                started_at: Utc::now(),
                completed_at: update.completed_at,
            };
            live.record.node_executions.push(node.clone());
            let index = live.record.node_executions.len() - 1;
            live.node_index.insert(node_id.to_string(), index);
            node
        };

        if node.status == NodeRunStatus::Running {
            live.record.current_node_id = Some(node_id.to_string());
        }

        self.persist(&live.record).await?;
        self.emitter.emit(ExecutionEvent::NodeUpdate {
            execution_id: execution_id.to_string(),
            node: node.clone(),
            current_node_id: live.record.current_node_id.clone(),
        });
        Ok(node)
    }

    /// Fold node-level spend into the running aggregates. Kept incremental
    /// so a run that later fails or is cancelled still carries what it
    /// spent.
    pub async fn add_usage(
        &self,
        execution_id: &str,
        tokens_used: u64,
        cost: f64,
    ) -> Result<(), EngineError> {
        if tokens_used == 0 && cost == 0.0 {
            return Ok(());
        }
        let entry = self.live_entry(execution_id, "record usage").await?;
        let mut live = entry.lock().await;
        guard_writable(&live.record, "record usage")?;

        live.record.tokens_used += tokens_used;
        live.record.cost += cost;
        self.persist(&live.record).await
    }

    /// Drive a running execution to `Completed`. Single-shot: the final
    /// totals are **set**, not added, so a repeated call cannot
    /// double-count (it is rejected by the Running-only guard anyway).
    pub async fn complete(
        &self,
        execution_id: &str,
        output: Option<Value>,
        tokens_used: u64,
        cost: f64,
    ) -> Result<(), EngineError> {
        let entry = self.live_entry(execution_id, "complete").await?;
        let mut live = entry.lock().await;
        if live.record.status != ExecutionStatus::Running {
            return Err(EngineError::IllegalTransition {
                status: live.record.status,
                operation: "complete",
            });
        }

        live.record.status = ExecutionStatus::Completed;
        live.record.output = output;
        live.record.tokens_used = tokens_used;
        live.record.cost = cost;
        live.record.current_node_id = None;
        push_log(&mut live.record, LogLevel::Info, "execution completed", None);
        seal(&mut live.record);

        self.finish(execution_id, &mut live).await
    }

    /// Drive a running execution to `Failed`, capturing the error.
    pub async fn fail(
        &self,
        execution_id: &str,
        error: impl Into<String>,
        error_details: Option<Value>,
    ) -> Result<(), EngineError> {
        let entry = self.live_entry(execution_id, "fail").await?;
        let mut live = entry.lock().await;
        if live.record.status != ExecutionStatus::Running {
            return Err(EngineError::IllegalTransition {
                status: live.record.status,
                operation: "fail",
            });
        }

        let error = error.into();
        live.record.status = ExecutionStatus::Failed;
        live.record.error = Some(error.clone());
        live.record.error_details = error_details;
        push_log(
            &mut live.record,
            LogLevel::Error,
            format!("execution failed: {error}"),
            None,
        );
        seal(&mut live.record);

        self.finish(execution_id, &mut live).await
    }

    /// Cancel a pending or running execution. The status flip is the
    /// authoritative signal the orchestrator observes cooperatively.
    pub async fn cancel(&self, execution_id: &str) -> Result<(), EngineError> {
        let entry = self.live_entry(execution_id, "cancel").await?;
        let mut live = entry.lock().await;
        if !matches!(
            live.record.status,
            ExecutionStatus::Pending | ExecutionStatus::Running
        ) {
            return Err(EngineError::IllegalTransition {
                status: live.record.status,
                operation: "cancel",
            });
        }

        live.record.status = ExecutionStatus::Cancelled;
        live.record.current_node_id = None;
        push_log(&mut live.record, LogLevel::Warn, "execution cancelled", None);
        seal(&mut live.record);

        self.finish(execution_id, &mut live).await
    }

    /// Current status of a live execution. `None` once it has left the
    /// live set (terminal) or never existed.
    pub async fn status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        let entry = self.live_arc(execution_id)?;
        let live = entry.lock().await;
        Some(live.record.status)
    }

    /// A point-in-time copy of the execution, from the live set when
    /// running, from the store once finished.
    pub async fn snapshot(&self, execution_id: &str) -> Result<FlowExecution, EngineError> {
        if let Some(entry) = self.live_arc(execution_id) {
            let live = entry.lock().await;
            return Ok(live.record.clone());
        }
        self.store
            .get(execution_id)
            .await?
            .ok_or_else(|| EngineError::ExecutionNotFound {
                id: execution_id.to_string(),
            })
    }

    // -- private helpers --

    /// Clone out the live entry without holding the registry lock past
    /// this synchronous call (the per-entry mutex is awaited later).
    fn live_arc(&self, execution_id: &str) -> Option<Arc<Mutex<LiveExecution>>> {
        self.live.read().get(execution_id).cloned()
    }

    /// Resolve the live entry for a mutation, or classify the rejection:
    /// terminal executions get `IllegalTransition`, unknown ids `NotFound`.
    async fn live_entry(
        &self,
        execution_id: &str,
        operation: &'static str,
    ) -> Result<Arc<Mutex<LiveExecution>>, EngineError> {
        if let Some(entry) = self.live_arc(execution_id) {
            return Ok(entry);
        }
        match self.store.get(execution_id).await? {
            Some(record) => Err(EngineError::IllegalTransition {
                status: record.status,
                operation,
            }),
            None => Err(EngineError::ExecutionNotFound {
                id: execution_id.to_string(),
            }),
        }
    }

    async fn persist(&self, record: &FlowExecution) -> Result<(), EngineError> {
        self.store.update(record).await.map_err(|e| {
            tracing::error!(execution_id = %record.id, error = %e, "failed to persist execution");
            EngineError::from(e)
        })
    }

    /// Shared tail of the three terminal transitions: persist, emit the
    /// single `Finished` event, retire the live entry and its channel.
    async fn finish(
        &self,
        execution_id: &str,
        live: &mut LiveExecution,
    ) -> Result<(), EngineError> {
        self.persist(&live.record).await?;

        self.emitter.emit(ExecutionEvent::Finished {
            execution_id: execution_id.to_string(),
            status: live.record.status,
            output: live.record.output.clone(),
            error: live.record.error.clone(),
            execution_time_ms: live.record.execution_time_ms.unwrap_or(0),
            tokens_used: live.record.tokens_used,
            cost: live.record.cost,
            timestamp: live.record.completed_at.unwrap_or_else(Utc::now),
        });

        self.live.write().remove(execution_id);
        self.emitter.remove(execution_id);
        Ok(())
    }
}

fn guard_writable(record: &FlowExecution, operation: &'static str) -> Result<(), EngineError> {
    if record.status.is_terminal() {
        return Err(EngineError::IllegalTransition {
            status: record.status,
            operation,
        });
    }
    Ok(())
}

fn push_log(
    record: &mut FlowExecution,
    level: LogLevel,
    message: impl Into<String>,
    node_id: Option<String>,
) {
    record.logs.push(LogEntry {
        timestamp: Utc::now(),
        level,
        message: message.into(),
        node_id,
    });
}

/// Stamp the terminal timestamps: `completed_at` and the derived duration.
fn seal(record: &mut FlowExecution) {
    let completed_at = Utc::now();
    record.completed_at = Some(completed_at);
    record.execution_time_ms =
        Some((completed_at - record.started_at).num_milliseconds().max(0) as u64);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
