//! Aggregate statistics over execution records.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionStatus, FlowExecution};

/// Aggregates over a set of executions — one flow's, or all of them.
///
/// `total_tokens`/`total_cost` sum across *all* executions regardless of
/// status: a failed run may still have spent tokens. The average duration
/// only counts completed executions that recorded one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "snake_case")]
pub struct ExecutionStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub running: usize,
    /// `completed / total * 100`; `0.0` when there are no executions.
    pub success_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_execution_time_ms: Option<f64>,
    pub total_tokens: u64,
    pub total_cost: f64,
    /// The most recently started execution, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<FlowExecution>,
}

/// Fold a set of execution records into aggregate stats.
pub fn compute_stats(executions: &[FlowExecution]) -> ExecutionStats {
    let total = executions.len();
    let completed = count(executions, ExecutionStatus::Completed);
    let failed = count(executions, ExecutionStatus::Failed);
    let running = count(executions, ExecutionStatus::Running);

    let success_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    let durations: Vec<u64> = executions
        .iter()
        .filter(|e| e.status == ExecutionStatus::Completed)
        .filter_map(|e| e.execution_time_ms)
        .collect();
    let avg_execution_time_ms = if durations.is_empty() {
        None
    } else {
        Some(durations.iter().sum::<u64>() as f64 / durations.len() as f64)
    };

    let total_tokens = executions.iter().map(|e| e.tokens_used).sum();
    let total_cost = executions.iter().map(|e| e.cost).sum();

    let last_execution = executions
        .iter()
        .max_by_key(|e| e.started_at)
        .cloned();

    ExecutionStats {
        total,
        completed,
        failed,
        running,
        success_rate,
        avg_execution_time_ms,
        total_tokens,
        total_cost,
        last_execution,
    }
}

fn count(executions: &[FlowExecution], status: ExecutionStatus) -> usize {
    executions.iter().filter(|e| e.status == status).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerKind;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn exec(status: ExecutionStatus, tokens: u64, duration_ms: Option<u64>) -> FlowExecution {
        let mut e = FlowExecution::new("f1", json!({}), TriggerKind::Manual, None);
        e.status = status;
        e.tokens_used = tokens;
        e.cost = tokens as f64 * 0.00001;
        e.execution_time_ms = duration_ms;
        e
    }

    #[test]
    fn empty_set_has_zero_success_rate() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.avg_execution_time_ms.is_none());
        assert!(stats.last_execution.is_none());
    }

    #[test]
    fn success_rate_formula() {
        let executions = vec![
            exec(ExecutionStatus::Completed, 100, Some(200)),
            exec(ExecutionStatus::Completed, 50, Some(400)),
            exec(ExecutionStatus::Failed, 30, Some(100)),
            exec(ExecutionStatus::Running, 0, None),
        ];
        let stats = compute_stats(&executions);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.running, 1);
        assert!((stats.success_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_duration_only_counts_completed_with_duration() {
        let executions = vec![
            exec(ExecutionStatus::Completed, 0, Some(200)),
            exec(ExecutionStatus::Completed, 0, Some(400)),
            // Failed run with a duration must not skew the average.
            exec(ExecutionStatus::Failed, 0, Some(10_000)),
            // Completed without a recorded duration is ignored.
            exec(ExecutionStatus::Completed, 0, None),
        ];
        let stats = compute_stats(&executions);
        assert_eq!(stats.avg_execution_time_ms, Some(300.0));
    }

    #[test]
    fn tokens_and_cost_sum_across_all_statuses() {
        let executions = vec![
            exec(ExecutionStatus::Completed, 100, Some(1)),
            exec(ExecutionStatus::Failed, 40, None),
            exec(ExecutionStatus::Cancelled, 10, None),
        ];
        let stats = compute_stats(&executions);
        assert_eq!(stats.total_tokens, 150, "failed/cancelled spend counts");
        assert!((stats.total_cost - 0.0015).abs() < 1e-9);
    }

    #[test]
    fn last_execution_is_most_recently_started() {
        let mut old = exec(ExecutionStatus::Completed, 0, Some(1));
        old.started_at = Utc::now() - Duration::hours(1);
        let newest = exec(ExecutionStatus::Running, 0, None);
        let newest_id = newest.id.clone();

        let stats = compute_stats(&[old, newest]);
        assert_eq!(stats.last_execution.unwrap().id, newest_id);
    }
}
