//! Trellis — a graph-based flow execution engine.
//!
//! Flows are directed graphs of typed nodes (input, agent, output,
//! condition, transform). The engine validates a flow's structure, drives
//! run instances through a strict lifecycle (`pending → running →
//! {completed | failed | cancelled}`), records per-node state, an
//! append-only log, and aggregate token/cost metrics, and streams every
//! committed mutation to live observers without ever letting a slow
//! observer block orchestration.
//!
//! Durable storage, the agent/LLM call itself, and the transport layer are
//! consumed through the traits in [`traits`]; the engine ships in-memory
//! defaults and is designed to be embedded with no web-server or database
//! dependencies of its own.

pub mod defaults;
pub mod emitter;
pub mod engine;
pub mod errors;
pub mod events;
pub(crate) mod executor;
pub(crate) mod expression;
pub mod node_ctx;
pub mod nodes;
pub mod recorder;
pub mod stats;
pub mod traits;
pub mod types;
pub mod validate;

// Re-export public types at the crate level.

// defaults
pub use defaults::{InMemoryExecutionStore, InMemoryFlowStore, StaticAgentProvider};

// emitter
pub use emitter::ProgressEmitter;

// engine
pub use engine::{Engine, EngineBuilder, EngineConfig, EngineError};

// errors
pub use errors::{ExecutionStoreError, FlowStoreError};

// events
pub use events::ExecutionEvent;

// node_ctx
pub use node_ctx::NodeCtx;

// nodes
pub use nodes::{default_handlers, AgentNode, ConditionNode, InputNode, OutputNode, TransformNode};

// recorder
pub use recorder::ExecutionRecorder;

// stats
pub use stats::{compute_stats, ExecutionStats};

// traits
pub use traits::{
    AgentProvider, AgentReply, ExecutionFilter, ExecutionStore, FlowStore, NodeHandler,
};

// types
pub use types::{
    AgentConfig, ConditionConfig, ExecutionStatus, FieldSpec, Flow, FlowExecution, FlowStatus,
    InputConfig, LogEntry, LogLevel, Node, NodeError, NodeExecution, NodeExecutionUpdate,
    NodeKind, NodeOutput, NodeRunStatus, OutputConfig, TransformConfig, TriggerKind,
};

// validate
pub use validate::{validate_nodes, ValidationReport};
