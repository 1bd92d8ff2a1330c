//! Engine error kinds.
//!
//! Every domain error is distinguishable by name; mapping to transport
//! status codes is the transport layer's concern, not the engine's.
//! Precondition and validation failures surface synchronously from the
//! calling operation and never partially mutate state; mid-walk failures
//! are recorded into the execution itself instead.

use thiserror::Error;

use crate::errors::{ExecutionStoreError, FlowStoreError};
use crate::types::ExecutionStatus;

/// Errors from [`Engine`](super::Engine) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The flow's node graph failed structural validation. No execution
    /// record was created.
    #[error("invalid flow definition: {}", errors.join("; "))]
    InvalidDefinition { errors: Vec<String> },
    /// The flow exists but is not eligible to run.
    #[error("flow is not active: {flow_id}")]
    NotActive { flow_id: String },
    /// The requested flow was not found.
    #[error("flow not found: {flow_id}")]
    FlowNotFound { flow_id: String },
    /// The requested execution was not found.
    #[error("execution not found: {id}")]
    ExecutionNotFound { id: String },
    /// A lifecycle operation was invoked from a state that forbids it. The
    /// record is left untouched.
    #[error("illegal transition: cannot {operation} an execution in status '{status}'")]
    IllegalTransition {
        status: ExecutionStatus,
        operation: &'static str,
    },
    /// An internal invariant was violated.
    #[error("engine fault: {message}")]
    EngineFault { message: String },
    /// A flow store error occurred.
    #[error("flow store error: {0}")]
    FlowStore(#[from] FlowStoreError),
    /// An execution store error occurred.
    #[error("execution store error: {0}")]
    ExecutionStore(#[from] ExecutionStoreError),
}
