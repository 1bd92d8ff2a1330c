//! Default in-memory implementations of the external collaborator traits.
//!
//! Suitable for tests, embedding, and short-lived processes. Production
//! deployments supply their own durable stores and agent provider through
//! the [`EngineBuilder`](crate::engine::EngineBuilder).

mod in_memory_execution_store;
mod in_memory_flow_store;
mod static_agent;

pub use in_memory_execution_store::InMemoryExecutionStore;
pub use in_memory_flow_store::InMemoryFlowStore;
pub use static_agent::StaticAgentProvider;
