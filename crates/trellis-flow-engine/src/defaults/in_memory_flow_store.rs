//! In-memory flow store for testing and lightweight usage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::FlowStoreError;
use crate::traits::FlowStore;
use crate::types::Flow;

/// In-memory implementation of [`FlowStore`].
///
/// Uses `BTreeMap` for deterministic iteration order (project convention).
#[derive(Default)]
pub struct InMemoryFlowStore {
    flows: RwLock<BTreeMap<String, Flow>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn get(&self, flow_id: &str) -> Result<Option<Flow>, FlowStoreError> {
        Ok(self.flows.read().await.get(flow_id).cloned())
    }

    async fn put(&self, flow: Flow) -> Result<(), FlowStoreError> {
        self.flows.write().await.insert(flow.id.clone(), flow);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Flow>, FlowStoreError> {
        Ok(self.flows.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_list() {
        let store = InMemoryFlowStore::new();
        assert!(store.get("f1").await.unwrap().is_none());

        store.put(Flow::new("f1", "First")).await.unwrap();
        store.put(Flow::new("f2", "Second")).await.unwrap();

        let flow = store.get("f1").await.unwrap().unwrap();
        assert_eq!(flow.name, "First");
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn put_replaces_existing() {
        let store = InMemoryFlowStore::new();
        store.put(Flow::new("f1", "Before")).await.unwrap();
        store.put(Flow::new("f1", "After")).await.unwrap();

        let flow = store.get("f1").await.unwrap().unwrap();
        assert_eq!(flow.name, "After");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
