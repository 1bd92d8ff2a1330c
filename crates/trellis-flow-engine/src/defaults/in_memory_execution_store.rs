//! In-memory execution store for testing and lightweight usage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::ExecutionStoreError;
use crate::traits::{ExecutionFilter, ExecutionStore};
use crate::types::FlowExecution;

/// In-memory implementation of [`ExecutionStore`].
///
/// Uses `BTreeMap` for deterministic iteration order (project convention).
/// Reads are strongly consistent with completed writes.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    executions: RwLock<BTreeMap<String, FlowExecution>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, execution: &FlowExecution) -> Result<(), ExecutionStoreError> {
        self.executions
            .write()
            .await
            .insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn update(&self, execution: &FlowExecution) -> Result<(), ExecutionStoreError> {
        let mut executions = self.executions.write().await;
        if !executions.contains_key(&execution.id) {
            return Err(ExecutionStoreError::NotFound {
                id: execution.id.clone(),
            });
        }
        executions.insert(execution.id.clone(), execution.clone());
        Ok(())
    }

    async fn get(&self, execution_id: &str) -> Result<Option<FlowExecution>, ExecutionStoreError> {
        Ok(self.executions.read().await.get(execution_id).cloned())
    }

    async fn list(
        &self,
        filter: &ExecutionFilter,
    ) -> Result<Vec<FlowExecution>, ExecutionStoreError> {
        let executions = self.executions.read().await;
        let mut matched: Vec<FlowExecution> = executions
            .values()
            .filter(|e| {
                if let Some(ref flow_id) = filter.flow_id {
                    if e.flow_id != *flow_id {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if e.status != status {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        // Most recently started first.
        matched.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionStatus, TriggerKind};
    use serde_json::json;

    fn exec(flow_id: &str) -> FlowExecution {
        FlowExecution::new(flow_id, json!({}), TriggerKind::Manual, None)
    }

    #[tokio::test]
    async fn create_get_round_trip() {
        let store = InMemoryExecutionStore::new();
        let e = exec("f1");
        store.create(&e).await.unwrap();

        let fetched = store.get(&e.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, e.id);
        assert!(store.get("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_requires_existing() {
        let store = InMemoryExecutionStore::new();
        let mut e = exec("f1");
        let err = store.update(&e).await.unwrap_err();
        assert!(matches!(err, ExecutionStoreError::NotFound { .. }));

        store.create(&e).await.unwrap();
        e.status = ExecutionStatus::Completed;
        store.update(&e).await.unwrap();
        let fetched = store.get(&e.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = InMemoryExecutionStore::new();
        let mut first = exec("f1");
        first.started_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        let mut failed = exec("f1");
        failed.status = ExecutionStatus::Failed;
        failed.started_at = chrono::Utc::now() - chrono::Duration::seconds(30);
        let latest = exec("f2");

        store.create(&first).await.unwrap();
        store.create(&failed).await.unwrap();
        store.create(&latest).await.unwrap();

        let all = store.list(&ExecutionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, latest.id, "most recently started first");

        let by_flow = store.list(&ExecutionFilter::for_flow("f1")).await.unwrap();
        assert_eq!(by_flow.len(), 2);

        let by_status = store
            .list(&ExecutionFilter::with_status(ExecutionStatus::Failed))
            .await
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id, failed.id);

        let limited = store
            .list(&ExecutionFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);
    }
}
