//! Read-only views of committed ledger data.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use propflow_core::{CashFlowCategory, PassNumber, Period, TransactionRecord};

/// Immutable view of every committed record at the moment it was taken.
///
/// Records are held in shared chunks, so snapshots of the batched backend are
/// cheap to take and never observe later writes.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    chunks: Vec<Arc<[TransactionRecord]>>,
    len: usize,
}

impl LedgerSnapshot {
    pub fn from_records(records: Vec<TransactionRecord>) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let len = records.len();
        Self {
            chunks: vec![Arc::from(records)],
            len,
        }
    }

    pub fn from_chunks(chunks: Vec<Arc<[TransactionRecord]>>) -> Self {
        let len = chunks.iter().map(|c| c.len()).sum();
        Self { chunks, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records from commit index `from` onward, sharing whole chunks where possible.
    pub fn tail(&self, from: usize) -> Self {
        if from == 0 {
            return self.clone();
        }
        let mut skip = from;
        let mut chunks = Vec::new();
        for chunk in &self.chunks {
            if skip >= chunk.len() {
                skip -= chunk.len();
            } else if skip > 0 {
                chunks.push(Arc::from(&chunk[skip..]));
                skip = 0;
            } else {
                chunks.push(Arc::clone(chunk));
            }
        }
        Self::from_chunks(chunks)
    }

    /// Records in commit order.
    pub fn iter(&self) -> impl Iterator<Item = &TransactionRecord> + '_ {
        self.chunks.iter().flat_map(|c| c.iter())
    }

    pub fn to_vec(&self) -> Vec<TransactionRecord> {
        self.iter().cloned().collect()
    }

    /// Earliest and latest record periods.
    pub fn period_span(&self) -> Option<(Period, Period)> {
        self.iter().map(TransactionRecord::period).fold(None, |span, p| match span {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
    }

    pub fn stats(&self) -> LedgerStats {
        let mut stats = LedgerStats {
            records: self.len,
            ..LedgerStats::default()
        };
        for record in self.iter() {
            match record.pass_num {
                PassNumber::Independent => stats.pass_one += 1,
                PassNumber::Dependent => stats.pass_two += 1,
            }
            *stats.by_category.entry(record.category).or_default() += 1;
            stats.net_amount += record.amount;
        }
        if let Some((first, last)) = self.period_span() {
            stats.first_period = Some(first);
            stats.last_period = Some(last);
        }
        stats
    }

    /// Rows as a JSON array, for external persistence or inspection.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl Serialize for LedgerSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for LedgerSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<TransactionRecord>::deserialize(deserializer).map(Self::from_records)
    }
}

/// Record counts and spans for debugging a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerStats {
    pub records: usize,
    pub pass_one: usize,
    pub pass_two: usize,
    pub by_category: BTreeMap<CashFlowCategory, usize>,
    pub first_period: Option<Period>,
    pub last_period: Option<Period>,
    /// Signed sum of every amount (valuations included).
    pub net_amount: f64,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use propflow_core::{AssetId, SeriesMetadata, SourceId};

    use super::*;

    fn chunk(amounts: &[f64]) -> Arc<[TransactionRecord]> {
        let metadata = SeriesMetadata::new(
            CashFlowCategory::Revenue,
            "Lease",
            "Base Rent",
            SourceId::new(),
            AssetId::new(),
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        amounts
            .iter()
            .map(|a| metadata.record(date, *a).unwrap())
            .collect::<Vec<_>>()
            .into()
    }

    fn amounts(snapshot: &LedgerSnapshot) -> Vec<f64> {
        snapshot.iter().map(|r| r.amount).collect()
    }

    #[test]
    fn tail_skips_across_chunk_boundaries() {
        let snapshot = LedgerSnapshot::from_chunks(vec![chunk(&[1.0, 2.0]), chunk(&[3.0, 4.0, 5.0])]);
        assert_eq!(amounts(&snapshot.tail(0)), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(amounts(&snapshot.tail(2)), vec![3.0, 4.0, 5.0]);
        assert_eq!(amounts(&snapshot.tail(3)), vec![4.0, 5.0]);
        assert_eq!(snapshot.tail(3).len(), 2);
        assert!(snapshot.tail(5).is_empty());
        assert!(snapshot.tail(9).is_empty());
    }
}
