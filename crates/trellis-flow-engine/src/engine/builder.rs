//! Engine assembly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::defaults::{InMemoryExecutionStore, InMemoryFlowStore, StaticAgentProvider};
use crate::emitter::ProgressEmitter;
use crate::nodes;
use crate::recorder::ExecutionRecorder;
use crate::traits::{AgentProvider, ExecutionStore, FlowStore, NodeHandler};
use crate::types::NodeKind;

use super::{Engine, EngineConfig};

/// Builds an [`Engine`]. Every component has an in-memory default; the five
/// built-in node handlers come pre-registered and can be overridden per
/// kind.
pub struct EngineBuilder {
    flow_store: Option<Arc<dyn FlowStore>>,
    execution_store: Option<Arc<dyn ExecutionStore>>,
    agents: Option<Arc<dyn AgentProvider>>,
    handlers: BTreeMap<NodeKind, Arc<dyn NodeHandler>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub(super) fn new() -> Self {
        Self {
            flow_store: None,
            execution_store: None,
            agents: None,
            handlers: nodes::default_handlers(),
            config: EngineConfig::default(),
        }
    }

    /// Use a custom flow store instead of the in-memory default.
    pub fn flow_store(mut self, store: Arc<dyn FlowStore>) -> Self {
        self.flow_store = Some(store);
        self
    }

    /// Use a custom execution store instead of the in-memory default.
    pub fn execution_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.execution_store = Some(store);
        self
    }

    /// The agent capability provider. Without one, agent nodes fail with an
    /// unknown-capability error.
    pub fn agents(mut self, agents: Arc<dyn AgentProvider>) -> Self {
        self.agents = Some(agents);
        self
    }

    /// Register (or replace) the handler for its node kind.
    pub fn handler(mut self, handler: Arc<dyn NodeHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Engine {
        let flow_store = self
            .flow_store
            .unwrap_or_else(|| Arc::new(InMemoryFlowStore::new()));
        let execution_store = self
            .execution_store
            .unwrap_or_else(|| Arc::new(InMemoryExecutionStore::new()));
        let agents = self
            .agents
            .unwrap_or_else(|| Arc::new(StaticAgentProvider::new()));

        let emitter = Arc::new(ProgressEmitter::new(self.config.event_capacity));
        let recorder = Arc::new(ExecutionRecorder::new(
            Arc::clone(&execution_store),
            Arc::clone(&emitter),
        ));

        Engine {
            flow_store,
            execution_store,
            agents,
            handlers: Arc::new(self.handlers),
            recorder,
            emitter,
            config: self.config,
            tasks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }
}
