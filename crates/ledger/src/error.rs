use thiserror::Error;

use propflow_core::{DomainError, TransactionId};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger write-path error.
///
/// `NestedTransaction` and `NoOpenTransaction` are transaction-state errors: the
/// caller used the transaction protocol incorrectly. None of these errors leave
/// partial writes behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("nested transactions unsupported: a transaction is already open")]
    NestedTransaction,

    #[error("no open transaction: `{operation}` requires an active transaction")]
    NoOpenTransaction { operation: &'static str },

    #[error("duplicate transaction id: {0}")]
    DuplicateTransactionId(TransactionId),

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("ledger lock poisoned")]
    Poisoned,
}
