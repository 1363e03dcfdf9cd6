use propflow_core::TransactionRecord;

use crate::error::LedgerResult;
use crate::snapshot::LedgerSnapshot;

/// Append-only storage for committed records.
///
/// Backends differ only in performance. Every implementation must:
/// - append a batch atomically (all records or none)
/// - keep records in commit order
/// - truncate back to an earlier length (transaction rollback only)
/// - hand out snapshots that never observe later writes
pub trait LedgerStore: Send + Sync + core::fmt::Debug {
    /// Stable backend name (for logs).
    fn name(&self) -> &'static str;

    /// Append one bulk batch of already-validated records.
    fn append(&mut self, records: Vec<TransactionRecord>) -> LedgerResult<()>;

    /// Drop every record at index `len` and beyond.
    fn truncate(&mut self, len: usize);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> LedgerSnapshot;
}

impl<S> LedgerStore for Box<S>
where
    S: LedgerStore + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn append(&mut self, records: Vec<TransactionRecord>) -> LedgerResult<()> {
        (**self).append(records)
    }

    fn truncate(&mut self, len: usize) {
        (**self).truncate(len)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn snapshot(&self) -> LedgerSnapshot {
        (**self).snapshot()
    }
}
