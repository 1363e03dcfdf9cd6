//! Query-layer errors.

use thiserror::Error;

use propflow_core::{Period, TransactionId};

use crate::key::AggregateKey;

/// A ledger snapshot cannot be queried.
///
/// Raised at [`LedgerQueries`](crate::LedgerQueries) construction, never later: once a
/// query object exists every aggregate is total.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("ledger snapshot is not an array of rows")]
    NotTabular,

    #[error("row {row} is missing required fields: {}", .missing.join(", "))]
    MissingFields {
        row: usize,
        missing: Vec<&'static str>,
    },

    #[error("row {row} is malformed: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("record {transaction_id} is invalid: {reason}")]
    InvalidRecord {
        transaction_id: TransactionId,
        reason: String,
    },
}

/// An aggregate key could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateLookupError {
    #[error("unknown aggregate key '{0}'")]
    UnknownKey(String),

    #[error("aggregate '{0}' has not been resolved")]
    NotResolved(AggregateKey),
}

/// A published total disagrees with the figures it is built from.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{identity} does not reconcile in {period}: expected {expected:.4}, found {actual:.4}")]
pub struct ReconciliationError {
    pub identity: &'static str,
    pub period: Period,
    pub expected: f64,
    pub actual: f64,
}
