use std::sync::Arc;

use propflow_core::TransactionRecord;

use super::r#trait::LedgerStore;
use crate::error::LedgerResult;
use crate::snapshot::LedgerSnapshot;

/// Bulk-load backend: each appended batch becomes one immutable shared chunk.
///
/// Snapshots clone chunk handles instead of records. Once more than
/// `compaction_threshold` chunks accumulate they are merged into one, which keeps
/// iteration cost flat for runs with many small writes.
#[derive(Debug)]
pub struct BatchedStore {
    chunks: Vec<Arc<[TransactionRecord]>>,
    len: usize,
    compaction_threshold: usize,
}

impl BatchedStore {
    pub fn new(compaction_threshold: usize) -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
            compaction_threshold: compaction_threshold.max(1),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn compact(&mut self) {
        let merged: Vec<TransactionRecord> = self
            .chunks
            .iter()
            .flat_map(|c| c.iter().cloned())
            .collect();
        tracing::debug!(
            chunks = self.chunks.len(),
            records = merged.len(),
            "compacting ledger chunks"
        );
        self.chunks = vec![Arc::from(merged)];
    }
}

impl Default for BatchedStore {
    fn default() -> Self {
        Self::new(64)
    }
}

impl LedgerStore for BatchedStore {
    fn name(&self) -> &'static str {
        "batched"
    }

    fn append(&mut self, records: Vec<TransactionRecord>) -> LedgerResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.len += records.len();
        self.chunks.push(Arc::from(records));
        if self.chunks.len() > self.compaction_threshold {
            self.compact();
        }
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        while self.len > len {
            let Some(last) = self.chunks.pop() else {
                break;
            };
            let chunk_start = self.len - last.len();
            if chunk_start >= len {
                self.len = chunk_start;
                continue;
            }
            // Cut point falls inside this chunk: keep its head.
            let keep = len - chunk_start;
            self.chunks.push(Arc::from(last[..keep].to_vec()));
            self.len = len;
        }
    }

    fn len(&self) -> usize {
        self.len
    }

    fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::from_chunks(self.chunks.clone())
    }
}
