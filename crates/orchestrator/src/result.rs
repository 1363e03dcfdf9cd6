//! What a run hands downstream.

use std::collections::BTreeMap;

use serde::Serialize;

use propflow_analysis::{AggregateKey, LedgerQueries, SchemaError};
use propflow_core::Series;
use propflow_ledger::LedgerSnapshot;

use crate::context::AnalysisContext;
use crate::error::OrchestrationError;

/// Counts from one successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrchestrationReport {
    pub independent: usize,
    pub dependent: usize,
    pub pass_one_records: usize,
    pub pass_two_records: usize,
    /// Aggregates resolved for the dependent pass.
    pub resolved_keys: Vec<AggregateKey>,
    /// Ledger index of this run's first record.
    pub first_record: usize,
    /// Records this run committed.
    pub committed: usize,
}

/// Final aggregates, the records this run committed and the run report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub lookups: BTreeMap<AggregateKey, Series>,
    pub snapshot: LedgerSnapshot,
    pub report: OrchestrationReport,
}

impl AnalysisResult {
    pub(crate) fn collect(
        context: &AnalysisContext,
        report: OrchestrationReport,
    ) -> Result<Self, OrchestrationError> {
        Ok(Self {
            lookups: context.resolved_lookups().clone(),
            snapshot: context.ledger().snapshot()?.tail(report.first_record),
            report,
        })
    }

    pub fn aggregate(&self, key: AggregateKey) -> Option<&Series> {
        self.lookups.get(&key)
    }

    /// Query object over this run's records, for breakdowns and partner flows.
    pub fn queries(&self) -> Result<LedgerQueries, SchemaError> {
        LedgerQueries::new(self.snapshot.clone())
    }
}
