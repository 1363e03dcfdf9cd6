//! State shared by every producer of one run.

use std::collections::BTreeMap;
use std::sync::Arc;

use propflow_analysis::{AggregateKey, AggregateLookupError};
use propflow_core::{AssetId, DealId, Series, Timeline};
use propflow_ledger::Ledger;

use crate::settings::AnalysisSettings;

/// Timeline, settings, the ledger handle and the aggregates resolved so far.
///
/// Producers only ever see `&AnalysisContext`; the orchestrator is the sole
/// writer of `resolved_lookups`.
#[derive(Debug)]
pub struct AnalysisContext {
    timeline: Timeline,
    settings: AnalysisSettings,
    ledger: Arc<Ledger>,
    asset_id: AssetId,
    deal_id: Option<DealId>,
    pub(crate) resolved_lookups: BTreeMap<AggregateKey, Series>,
}

impl AnalysisContext {
    /// Context over a fresh ledger built from `settings`.
    pub fn new(timeline: Timeline, settings: AnalysisSettings, asset_id: AssetId) -> Self {
        let ledger = Arc::new(settings.build_ledger());
        Self {
            timeline,
            settings,
            ledger,
            asset_id,
            deal_id: None,
            resolved_lookups: BTreeMap::new(),
        }
    }

    /// Share an existing ledger (e.g. one holding an earlier asset's results).
    ///
    /// Records already in the ledger stay there but never feed this context's
    /// aggregates: each run resolves lookups from the records it wrote itself.
    pub fn with_ledger(mut self, ledger: Arc<Ledger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    pub fn deal_id(&self) -> Option<DealId> {
        self.deal_id
    }

    pub fn resolved_lookups(&self) -> &BTreeMap<AggregateKey, Series> {
        &self.resolved_lookups
    }

    /// Resolved value of `key`.
    ///
    /// During the independent pass nothing is resolved, so every lookup fails with
    /// [`AggregateLookupError::NotResolved`].
    pub fn lookup(&self, key: AggregateKey) -> Result<&Series, AggregateLookupError> {
        self.resolved_lookups
            .get(&key)
            .ok_or(AggregateLookupError::NotResolved(key))
    }

    /// [`lookup`](Self::lookup) by display label or abbreviation.
    pub fn lookup_label(&self, label: &str) -> Result<&Series, AggregateLookupError> {
        self.lookup(label.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propflow_core::Period;

    fn context() -> AnalysisContext {
        AnalysisContext::new(
            Timeline::new(Period::new(2024, 1).unwrap(), 12),
            AnalysisSettings::default(),
            AssetId::new(),
        )
    }

    #[test]
    fn unresolved_lookup_fails() {
        let ctx = context();
        assert_eq!(
            ctx.lookup(AggregateKey::NetOperatingIncome).unwrap_err(),
            AggregateLookupError::NotResolved(AggregateKey::NetOperatingIncome)
        );
    }

    #[test]
    fn label_lookup_distinguishes_unknown_from_unresolved() {
        let mut ctx = context();
        let egi = Series::zeros(ctx.timeline());
        ctx.resolved_lookups
            .insert(AggregateKey::EffectiveGrossIncome, egi);
        assert_eq!(ctx.lookup_label("EGI").unwrap().len(), 12);
        assert!(matches!(
            ctx.lookup_label("Gross Margin"),
            Err(AggregateLookupError::UnknownKey(_))
        ));
        assert!(matches!(
            ctx.lookup_label("NOI"),
            Err(AggregateLookupError::NotResolved(AggregateKey::NetOperatingIncome))
        ));
    }
}
