//! Storage backends for committed records.
//!
//! The [`Ledger`](crate::Ledger) owns transaction semantics; a store only keeps
//! committed records in order. Both backends here are interchangeable.

pub mod batched;
pub mod in_memory;
pub mod r#trait;

pub use batched::BatchedStore;
pub use in_memory::InMemoryStore;
pub use r#trait::LedgerStore;

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use propflow_core::{AssetId, CashFlowCategory, SeriesMetadata, SourceId, Subcategory};

    use super::*;

    fn records(n: usize) -> Vec<propflow_core::TransactionRecord> {
        let meta = SeriesMetadata::new(
            CashFlowCategory::Revenue,
            Subcategory::Lease,
            "Rent",
            SourceId::new(),
            AssetId::new(),
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| meta.record(date, i as f64 + 1.0).unwrap())
            .collect()
    }

    #[test]
    fn batched_truncate_splits_the_last_chunk() {
        let mut store = BatchedStore::new(16);
        store.append(records(3)).unwrap();
        store.append(records(4)).unwrap();
        store.truncate(5);
        assert_eq!(store.len(), 5);
        assert_eq!(store.chunk_count(), 2);
        assert_eq!(store.snapshot().len(), 5);
    }

    #[test]
    fn batched_compacts_past_threshold() {
        let mut store = BatchedStore::new(2);
        for _ in 0..3 {
            store.append(records(2)).unwrap();
        }
        assert_eq!(store.chunk_count(), 1);
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn snapshots_do_not_observe_later_appends() {
        let mut store = BatchedStore::default();
        store.append(records(2)).unwrap();
        let before = store.snapshot();
        store.append(records(3)).unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(store.snapshot().len(), 5);
    }

    proptest! {
        /// Property: any interleaving of appends and truncations leaves both
        /// backends holding the same records in the same order.
        #[test]
        fn backends_agree(ops in prop::collection::vec((0usize..6, any::<bool>(), 0usize..20), 1..25)) {
            let mut simple = InMemoryStore::new();
            let mut batched = BatchedStore::new(3);

            for (n, truncate, cut) in ops {
                if truncate {
                    let len = cut.min(simple.len());
                    simple.truncate(len);
                    batched.truncate(len);
                } else {
                    let batch = records(n);
                    simple.append(batch.clone()).unwrap();
                    batched.append(batch).unwrap();
                }
                prop_assert_eq!(simple.len(), batched.len());
            }

            let a: Vec<_> = simple.snapshot().iter().map(|r| r.transaction_id).collect();
            let b: Vec<_> = batched.snapshot().iter().map(|r| r.transaction_id).collect();
            prop_assert_eq!(a, b);
        }
    }
}
