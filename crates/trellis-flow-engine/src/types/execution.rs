//! Execution run records: per-node state, the append-only log, aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// FlowExecution
// ---------------------------------------------------------------------------

/// One run instance of a flow.
///
/// While the status is non-terminal, the execution recorder is the only
/// writer of `logs`, `node_executions`, `current_node_id`, and the
/// aggregates. Terminal records are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct FlowExecution {
    pub id: String,
    pub flow_id: String,
    pub status: ExecutionStatus,
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Published for observers only — the orchestrator never reads it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node_id: Option<String>,
    #[serde(default)]
    pub node_executions: Vec<NodeExecution>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost: f64,
    pub triggered_by: TriggerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
    /// Set when this execution was created by `retry`: the id of the failed
    /// execution it was retried from. The original is never mutated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<String>,
}

impl FlowExecution {
    /// Create a fresh execution in `Running` with a random UUID v4 id.
    pub fn new(
        flow_id: impl Into<String>,
        input: Value,
        triggered_by: TriggerKind,
        trigger_data: Option<Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            flow_id: flow_id.into(),
            status: ExecutionStatus::Running,
            input,
            output: None,
            current_node_id: None,
            node_executions: Vec::new(),
            logs: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            execution_time_ms: None,
            tokens_used: 0,
            cost: 0.0,
            triggered_by,
            trigger_data,
            error: None,
            error_details: None,
            retry_of: None,
        }
    }

    /// The recorded state for a node, if it has been visited.
    pub fn node_execution(&self, node_id: &str) -> Option<&NodeExecution> {
        self.node_executions.iter().find(|n| n.node_id == node_id)
    }
}

/// Lifecycle status of an execution.
///
/// Legal transitions: `Pending → Running → {Completed | Failed | Cancelled}`,
/// plus `Pending → Cancelled`. Terminal states permit no further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The origin of a run request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TriggerKind {
    Manual,
    Schedule,
    Webhook,
    Api,
}

// ---------------------------------------------------------------------------
// Per-node state
// ---------------------------------------------------------------------------

/// The recorded state of a single node visit within an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct NodeExecution {
    pub node_id: String,
    pub status: NodeRunStatus,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Status of a single node visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum NodeRunStatus {
    Running,
    Completed,
    Failed,
}

/// A partial update merged onto a node's recorded state by the recorder.
/// Fields left `None` keep their current value, which is what makes
/// `update_node` idempotent under replay.
#[derive(Debug, Clone, Default)]
pub struct NodeExecutionUpdate {
    pub status: Option<NodeRunStatus>,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NodeExecutionUpdate {
    /// Mark a node as started with its resolved input.
    pub fn started(input: Value) -> Self {
        Self {
            status: Some(NodeRunStatus::Running),
            input: Some(input),
            ..Self::default()
        }
    }

    /// Mark a node as completed with its output.
    pub fn completed(output: Value) -> Self {
        Self {
            status: Some(NodeRunStatus::Completed),
            output: Some(output),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Mark a node as failed with its error message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(NodeRunStatus::Failed),
            error: Some(error.into()),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// One entry in an execution's append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_execution_starts_running() {
        let exec = FlowExecution::new("f1", json!({"x": 1}), TriggerKind::Manual, None);
        assert_eq!(exec.status, ExecutionStatus::Running);
        assert!(exec.output.is_none());
        assert!(exec.node_executions.is_empty());
        assert!(exec.logs.is_empty());
        assert_eq!(exec.tokens_used, 0);
        assert!(exec.retry_of.is_none());
        assert!(!exec.id.is_empty());
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = FlowExecution::new("f1", Value::Null, TriggerKind::Api, None);
        let b = FlowExecution::new("f1", Value::Null, TriggerKind::Api, None);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn status_display_matches_serde() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            let s = serde_json::to_string(&status).unwrap();
            assert_eq!(s, format!("\"{status}\""));
        }
    }

    #[test]
    fn update_helpers_set_expected_fields() {
        let started = NodeExecutionUpdate::started(json!({"a": 1}));
        assert_eq!(started.status, Some(NodeRunStatus::Running));
        assert!(started.completed_at.is_none());

        let completed = NodeExecutionUpdate::completed(json!("out"));
        assert_eq!(completed.status, Some(NodeRunStatus::Completed));
        assert!(completed.completed_at.is_some());
        assert!(completed.input.is_none());

        let failed = NodeExecutionUpdate::failed("boom");
        assert_eq!(failed.status, Some(NodeRunStatus::Failed));
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn execution_round_trip() {
        let mut exec = FlowExecution::new("f1", json!({"q": "hi"}), TriggerKind::Webhook, None);
        exec.logs.push(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: "started".into(),
            node_id: None,
        });
        exec.node_executions.push(NodeExecution {
            node_id: "i1".into(),
            status: NodeRunStatus::Completed,
            input: json!({"q": "hi"}),
            output: Some(json!({"q": "hi"})),
            error: None,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
        });

        let s = serde_json::to_string(&exec).unwrap();
        let rt: FlowExecution = serde_json::from_str(&s).unwrap();
        assert_eq!(rt.id, exec.id);
        assert_eq!(rt.logs.len(), 1);
        assert!(rt.node_execution("i1").is_some());
        assert!(rt.node_execution("a1").is_none());
        assert_eq!(rt.triggered_by, TriggerKind::Webhook);
    }
}
