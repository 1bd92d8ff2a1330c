//! The single event enum for the per-execution streaming feed.
//!
//! Observers receive, in commit order: one `Started`, any number of `Log`
//! and `NodeUpdate` events, then exactly one `Finished`. Late subscribers
//! miss earlier events and must tolerate gaps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ExecutionStatus, LogEntry, NodeExecution, TriggerKind};

/// A committed mutation on a live execution, fanned out to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case", tag = "event_type")]
#[non_exhaustive]
pub enum ExecutionEvent {
    Started {
        execution_id: String,
        flow_id: String,
        input: Value,
        triggered_by: TriggerKind,
        timestamp: DateTime<Utc>,
    },
    Log {
        execution_id: String,
        entry: LogEntry,
    },
    NodeUpdate {
        execution_id: String,
        node: NodeExecution,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_node_id: Option<String>,
    },
    /// The single terminal event: carries the final status
    /// (completed/failed/cancelled) and the aggregates.
    Finished {
        execution_id: String,
        status: ExecutionStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        execution_time_ms: u64,
        tokens_used: u64,
        cost: f64,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// The execution this event belongs to.
    pub fn execution_id(&self) -> &str {
        match self {
            Self::Started { execution_id, .. }
            | Self::Log { execution_id, .. }
            | Self::NodeUpdate { execution_id, .. }
            | Self::Finished { execution_id, .. } => execution_id,
        }
    }

    /// Whether this is the terminal event of the feed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}
