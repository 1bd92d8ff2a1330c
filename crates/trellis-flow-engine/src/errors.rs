//! Error types for the persistence trait operations.

use thiserror::Error;

/// Errors from [`FlowStore`](crate::traits::FlowStore).
#[derive(Debug, Error)]
pub enum FlowStoreError {
    #[error("flow not found: {id}")]
    NotFound { id: String },
    #[error("flow store error: {message}")]
    Store { message: String },
}

/// Errors from [`ExecutionStore`](crate::traits::ExecutionStore).
#[derive(Debug, Error)]
pub enum ExecutionStoreError {
    #[error("execution not found: {id}")]
    NotFound { id: String },
    #[error("execution store error: {message}")]
    Store { message: String },
}
