//! Error types for the store boundary and the transaction protocol
//!
//! - [`StoreError`]: failures of the graph store or of query construction
//! - [`TxnError`]: what a transaction operation can fail with
//!
//! Both expose `category()`, the label under which failures are counted.

use crate::model::Violation;
use crate::sparql::{MappingError, QueryBuildError};
use crate::transaction::TransactionState;
use thiserror::Error;

/// Failure of the underlying store or of the query layer in front of it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] QueryBuildError),

    #[error("query evaluation failed: {message}")]
    Evaluation { query: String, message: String },

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("unexpected result shape: {0}")]
    ResultShape(#[from] MappingError),

    #[error("invalid IRI '{iri}': {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("a store transaction is already active")]
    TransactionActive,

    #[error("no store transaction is active")]
    NoActiveTransaction,
}

impl StoreError {
    /// Error category for metrics
    pub fn category(&self) -> &'static str {
        match self {
            StoreError::MalformedQuery(_) | StoreError::ResultShape(_) => "query_error",
            StoreError::Evaluation { .. } => "evaluation_error",
            StoreError::Storage(_) => "storage_error",
            StoreError::InvalidIri { .. } => "client_error",
            StoreError::TransactionActive | StoreError::NoActiveTransaction => "state_error",
        }
    }
}

/// Failure of a transaction operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TxnError {
    /// The graph state produced by the transaction violates the schema. The
    /// store has already been rolled back.
    #[error("schema validation failed: {0}")]
    ValidationFailed(Box<Violation>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot {operation} a transaction in state {state}")]
    InvalidState {
        state: TransactionState,
        operation: &'static str,
    },
}

impl TxnError {
    pub fn category(&self) -> &'static str {
        match self {
            TxnError::ValidationFailed(_) => "validation_failed",
            TxnError::Store(err) => err.category(),
            TxnError::InvalidState { .. } => "invalid_state",
        }
    }

    /// The violation behind a validation failure.
    pub fn violation(&self) -> Option<&Violation> {
        match self {
            TxnError::ValidationFailed(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<Violation> for TxnError {
    fn from(violation: Violation) -> Self {
        TxnError::ValidationFailed(Box::new(violation))
    }
}
