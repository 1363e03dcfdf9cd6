//! The transactional ledger.
//!
//! ## Write path
//!
//! ```text
//! add_series / add_records
//!   ├─ no open transaction → validate → append as one batch (visible immediately)
//!   └─ open transaction    → validate → buffer (invisible)
//!                                         ├─ flush()    → append buffer, stay open
//!                                         ├─ commit()   → append buffer, close
//!                                         └─ rollback() → drop buffer, truncate to watermark
//! ```
//!
//! The watermark is the committed length when the transaction opened. Rolling back
//! truncates to it, so records flushed inside a failed transaction disappear too.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use propflow_core::{Series, SeriesMetadata, TransactionId, TransactionRecord};

use crate::config::{LedgerBackend, LedgerConfig};
use crate::error::{LedgerError, LedgerResult};
use crate::snapshot::{LedgerSnapshot, LedgerStats};
use crate::store::{BatchedStore, InMemoryStore, LedgerStore};

#[derive(Debug)]
struct OpenTransaction {
    watermark: usize,
    buffer: Vec<TransactionRecord>,
    /// Ids appended to the store by `flush` during this transaction.
    flushed: Vec<TransactionId>,
}

#[derive(Debug)]
struct LedgerInner {
    store: Box<dyn LedgerStore>,
    /// Committed and buffered ids, for uniqueness checks.
    ids: HashSet<TransactionId>,
    open: Option<OpenTransaction>,
}

impl LedgerInner {
    /// Validate a batch against the record invariants and known ids. All or nothing.
    fn admit(&self, records: &[TransactionRecord]) -> LedgerResult<()> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            record.validate()?;
            if self.ids.contains(&record.transaction_id) || !seen.insert(record.transaction_id) {
                return Err(LedgerError::DuplicateTransactionId(record.transaction_id));
            }
        }
        Ok(())
    }

    fn write(&mut self, records: Vec<TransactionRecord>) -> LedgerResult<usize> {
        self.admit(&records)?;
        let count = records.len();
        if count == 0 {
            return Ok(0);
        }

        let ids: Vec<TransactionId> = records.iter().map(|r| r.transaction_id).collect();
        match self.open.as_mut() {
            Some(tx) => {
                tx.buffer.extend(records);
                tracing::debug!(records = count, buffered = tx.buffer.len(), "buffered ledger write");
            }
            None => {
                self.store.append(records)?;
                tracing::debug!(records = count, committed = self.store.len(), "committed ledger write");
            }
        }
        self.ids.extend(ids);
        Ok(count)
    }

    fn flush(&mut self) -> LedgerResult<usize> {
        let Some(tx) = self.open.as_mut() else {
            return Err(LedgerError::NoOpenTransaction { operation: "flush" });
        };
        let buffer = std::mem::take(&mut tx.buffer);
        let count = buffer.len();
        if count > 0 {
            tx.flushed.extend(buffer.iter().map(|r| r.transaction_id));
            self.store.append(buffer)?;
        }
        Ok(count)
    }

    fn commit(&mut self) -> LedgerResult<usize> {
        let Some(mut tx) = self.open.take() else {
            return Err(LedgerError::NoOpenTransaction { operation: "commit" });
        };
        let buffer = std::mem::take(&mut tx.buffer);
        if !buffer.is_empty() {
            tx.flushed.extend(buffer.iter().map(|r| r.transaction_id));
            if let Err(err) = self.store.append(buffer) {
                self.open = Some(tx);
                self.rollback();
                return Err(err);
            }
        }
        let written = self.store.len() - tx.watermark;
        tracing::info!(
            records = written,
            committed = self.store.len(),
            "ledger transaction committed"
        );
        Ok(written)
    }

    fn rollback(&mut self) {
        let Some(tx) = self.open.take() else {
            return;
        };
        let discarded = tx.buffer.len() + (self.store.len() - tx.watermark);
        for record in &tx.buffer {
            self.ids.remove(&record.transaction_id);
        }
        for id in &tx.flushed {
            self.ids.remove(id);
        }
        self.store.truncate(tx.watermark);
        tracing::warn!(
            discarded,
            committed = self.store.len(),
            "ledger transaction rolled back"
        );
    }
}

/// Single source of truth for every dated flow produced in one run.
///
/// All methods take `&self`; internal state sits behind one mutex so the ledger can
/// be shared through an `Arc`. There is still exactly one writer per run.
#[derive(Debug)]
pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    pub fn new(store: impl LedgerStore + 'static) -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                store: Box::new(store),
                ids: HashSet::new(),
                open: None,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(InMemoryStore::new())
    }

    pub fn batched(compaction_threshold: usize) -> Self {
        Self::new(BatchedStore::new(compaction_threshold))
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        match config.backend {
            LedgerBackend::InMemory => Self::in_memory(),
            LedgerBackend::Batched => Self::batched(config.compaction_threshold),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, LedgerInner>> {
        self.inner.lock().map_err(|_| LedgerError::Poisoned)
    }

    /// Name of the storage backend.
    pub fn backend(&self) -> LedgerResult<&'static str> {
        Ok(self.lock()?.store.name())
    }

    /// Explode a period-indexed series into records tagged with `metadata`.
    ///
    /// Each value becomes one record dated the first day of its period. Exact zeros
    /// are skipped. Returns the number of records written (or buffered).
    pub fn add_series(&self, series: &Series, metadata: &SeriesMetadata) -> LedgerResult<usize> {
        let records = series
            .iter()
            .filter(|(_, amount)| *amount != 0.0)
            .map(|(period, amount)| {
                period
                    .first_day()
                    .and_then(|date| metadata.record(date, amount))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.lock()?.write(records)
    }

    /// Write pre-built records. The whole batch is rejected if any record is invalid.
    pub fn add_records(
        &self,
        records: impl IntoIterator<Item = TransactionRecord>,
    ) -> LedgerResult<usize> {
        let records: Vec<_> = records.into_iter().collect();
        self.lock()?.write(records)
    }

    /// Open a transaction. Writes are buffered until the returned guard commits.
    ///
    /// Fails with [`LedgerError::NestedTransaction`] if one is already open; the open
    /// transaction is left untouched. Dropping the guard without committing rolls back.
    pub fn begin(&self) -> LedgerResult<Transaction<'_>> {
        let mut inner = self.lock()?;
        if inner.open.is_some() {
            return Err(LedgerError::NestedTransaction);
        }
        let watermark = inner.store.len();
        inner.open = Some(OpenTransaction {
            watermark,
            buffer: Vec::new(),
            flushed: Vec::new(),
        });
        tracing::debug!(watermark, "ledger transaction opened");
        Ok(Transaction {
            ledger: self,
            watermark,
            finished: false,
        })
    }

    /// Run `f` inside a transaction: `Ok` commits, `Err` (or a panic) rolls back.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Ledger) -> Result<T, E>) -> Result<T, E>
    where
        E: From<LedgerError>,
    {
        let tx = self.begin()?;
        match f(self) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Make buffered records queryable while keeping the transaction open.
    ///
    /// Returns the number of records flushed. Errors outside a transaction.
    pub fn flush(&self) -> LedgerResult<usize> {
        let mut inner = self.lock()?;
        let count = inner.flush()?;
        tracing::debug!(records = count, committed = inner.store.len(), "ledger flushed");
        Ok(count)
    }

    /// Snapshot of committed records. Buffered records are excluded.
    pub fn snapshot(&self) -> LedgerResult<LedgerSnapshot> {
        Ok(self.lock()?.store.snapshot())
    }

    /// Number of committed records.
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.store.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Records written inside the open transaction and not yet flushed.
    pub fn buffered_len(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.open.as_ref().map_or(0, |tx| tx.buffer.len()))
    }

    pub fn in_transaction(&self) -> LedgerResult<bool> {
        Ok(self.lock()?.open.is_some())
    }

    pub fn stats(&self) -> LedgerResult<LedgerStats> {
        Ok(self.snapshot()?.stats())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Guard for an open transaction.
///
/// Consume it with [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback); dropping it un-committed rolls back.
#[derive(Debug)]
#[must_use = "dropping a transaction without committing rolls it back"]
pub struct Transaction<'a> {
    ledger: &'a Ledger,
    watermark: usize,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub fn ledger(&self) -> &'a Ledger {
        self.ledger
    }

    /// Committed length when the transaction opened. Records at or past this index
    /// were written by this transaction.
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// See [`Ledger::flush`].
    pub fn flush(&self) -> LedgerResult<usize> {
        self.ledger.flush()
    }

    /// Append the remaining buffer and close the transaction.
    ///
    /// Returns the number of records the whole transaction wrote (flushed included).
    pub fn commit(mut self) -> LedgerResult<usize> {
        self.finished = true;
        match self.ledger.inner.lock() {
            Ok(mut inner) => inner.commit(),
            Err(poisoned) => {
                poisoned.into_inner().rollback();
                Err(LedgerError::Poisoned)
            }
        }
    }

    /// Discard everything this transaction wrote, flushed records included.
    pub fn rollback(mut self) {
        self.finished = true;
        self.rollback_inner();
    }

    fn rollback_inner(&self) {
        // Recover from poisoning: rollback must still restore the watermark.
        let mut inner = match self.ledger.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.rollback();
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.rollback_inner();
        }
    }
}
