use propflow_core::TransactionRecord;

use super::r#trait::LedgerStore;
use crate::error::LedgerResult;
use crate::snapshot::LedgerSnapshot;

/// Reference backend: one contiguous vector.
///
/// Every snapshot copies the full record set. Simple and predictable; prefer
/// [`BatchedStore`](super::BatchedStore) when snapshots are taken often.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Vec<TransactionRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    fn append(&mut self, records: Vec<TransactionRecord>) -> LedgerResult<()> {
        self.records.extend(records);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::from_records(self.records.clone())
    }
}
