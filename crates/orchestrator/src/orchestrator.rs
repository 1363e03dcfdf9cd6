//! Two-pass cash-flow execution.
//!
//! ```text
//! producers
//!   ↓
//! 0. Partition: reference unset → independent, set → dependent
//!   ↓
//! 1. begin ledger transaction
//!   ↓
//! 2. Pass 1: compute_cf for every independent producer, write (pass_num = 1), flush
//!   ↓
//! 3. Resolve every referenced aggregate (and its components) from the flushed pass-1 records
//!   ↓
//! 4. Pass 2: compute_cf for every dependent producer, write (pass_num = 2)
//!   ↓
//! 5. (settings.reconcile) flush, check flow-purpose groups and breakdowns against totals
//!   ↓
//! 6. commit
//!   ↓
//! 7. Resolve every aggregate from the records this run committed
//! ```
//!
//! Aggregates only ever cover records past the transaction's watermark, so records
//! left in a shared ledger by earlier runs or other assets never feed a run.
//!
//! Any failure in steps 2-6 rolls the transaction back (flushed pass-1 records
//! included) and restores the context's resolved lookups to their pre-run state.
//! A panicking producer gets the same treatment before the panic resumes.
//!
//! Dependent producers observe aggregates built from independent producers only, so
//! a fee on operating expenses that is itself an operating expense does not feed
//! back into its own base.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Deref, DerefMut};

use propflow_analysis::{AggregateKey, LedgerQueries, reconcile};
use propflow_core::{PassNumber, Series, SeriesMetadata};
use propflow_ledger::Transaction;

use crate::context::AnalysisContext;
use crate::error::OrchestrationError;
use crate::model::{CashFlowModel, CashFlowOutput};
use crate::result::{AnalysisResult, OrchestrationReport};

/// Runs a fixed set of producers against an [`AnalysisContext`].
#[derive(Debug, Default)]
pub struct CashFlowOrchestrator {
    models: Vec<Box<dyn CashFlowModel>>,
}

impl CashFlowOrchestrator {
    pub fn new(models: Vec<Box<dyn CashFlowModel>>) -> Self {
        Self { models }
    }

    pub fn with_model(mut self, model: impl CashFlowModel + 'static) -> Self {
        self.models.push(Box::new(model));
        self
    }

    pub fn models(&self) -> &[Box<dyn CashFlowModel>] {
        &self.models
    }

    /// Execute and bundle the outcome for downstream consumers.
    pub fn run(&self, context: &mut AnalysisContext) -> Result<AnalysisResult, OrchestrationError> {
        let report = self.execute(context)?;
        AnalysisResult::collect(context, report)
    }

    /// Execute every producer. On success `context.resolved_lookups()` holds every
    /// aggregate in [`AggregateKey::ALL`] over the records this run committed.
    pub fn execute(
        &self,
        context: &mut AnalysisContext,
    ) -> Result<OrchestrationReport, OrchestrationError> {
        let span = tracing::info_span!(
            "cash_flow_run",
            asset_id = %context.asset_id(),
            producers = self.models.len()
        );
        let _enter = span.enter();

        let (independent, dependent): (Vec<&dyn CashFlowModel>, Vec<&dyn CashFlowModel>) = self
            .models
            .iter()
            .map(|m| m.as_ref())
            .partition(|m| m.reference().is_none());
        tracing::info!(
            independent = independent.len(),
            dependent = dependent.len(),
            "cash flow run started"
        );

        let ledger = context.ledger().clone();
        let tx = ledger.begin()?;
        let watermark = tx.watermark();
        // Declared after `tx`: on unwind the lookups are restored, then the ledger rolls back.
        let mut run = LookupGuard::take(context);

        let outcome = match run_passes(&mut run, &tx, &independent, &dependent) {
            Ok(report) => tx.commit().map(|_| report).map_err(OrchestrationError::from),
            Err(err) => {
                tx.rollback();
                Err(err)
            }
        };
        let outcome = outcome.and_then(|mut report| {
            let queries = snapshot_queries(&run, watermark)?;
            run.resolved_lookups = queries.aggregates(AggregateKey::ALL);
            report.first_record = watermark;
            report.committed = queries.snapshot().len();
            Ok(report)
        });

        match outcome {
            Ok(report) => {
                run.keep();
                tracing::info!(
                    pass_one = report.pass_one_records,
                    pass_two = report.pass_two_records,
                    committed = report.committed,
                    "cash flow run committed"
                );
                Ok(report)
            }
            Err(err) => {
                drop(run);
                tracing::warn!(error = %err, "cash flow run rolled back");
                Err(err)
            }
        }
    }
}

/// Holds a context's pre-run lookups and puts them back on drop, unless the run
/// succeeded and called [`keep`](Self::keep).
struct LookupGuard<'a> {
    context: &'a mut AnalysisContext,
    saved: Option<BTreeMap<AggregateKey, Series>>,
}

impl<'a> LookupGuard<'a> {
    /// Empty the context's lookups for the run.
    fn take(context: &'a mut AnalysisContext) -> Self {
        let saved = std::mem::take(&mut context.resolved_lookups);
        Self {
            context,
            saved: Some(saved),
        }
    }

    fn keep(mut self) {
        self.saved = None;
    }
}

impl Deref for LookupGuard<'_> {
    type Target = AnalysisContext;

    fn deref(&self) -> &AnalysisContext {
        self.context
    }
}

impl DerefMut for LookupGuard<'_> {
    fn deref_mut(&mut self) -> &mut AnalysisContext {
        self.context
    }
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.context.resolved_lookups = saved;
        }
    }
}

fn run_passes(
    context: &mut AnalysisContext,
    tx: &Transaction<'_>,
    independent: &[&dyn CashFlowModel],
    dependent: &[&dyn CashFlowModel],
) -> Result<OrchestrationReport, OrchestrationError> {
    let mut report = OrchestrationReport {
        independent: independent.len(),
        dependent: dependent.len(),
        ..OrchestrationReport::default()
    };

    for model in independent {
        report.pass_one_records += run_model(*model, context, PassNumber::Independent)?;
    }
    tx.flush()?;
    tracing::info!(records = report.pass_one_records, "independent pass flushed");

    let keys: BTreeSet<AggregateKey> = dependent
        .iter()
        .filter_map(|m| m.reference())
        .flat_map(|key| key.closure())
        .collect();
    if !keys.is_empty() {
        let queries = snapshot_queries(context, tx.watermark())?;
        context.resolved_lookups = queries.aggregates(keys.iter().copied());
        report.resolved_keys = keys.into_iter().collect();
        tracing::debug!(keys = report.resolved_keys.len(), "intermediate aggregates resolved");
    }

    for model in dependent {
        report.pass_two_records += run_model(*model, context, PassNumber::Dependent)?;
    }

    if context.settings().reconcile {
        tx.flush()?;
        reconcile(&snapshot_queries(context, tx.watermark())?, context.settings().tolerance)?;
    }
    Ok(report)
}

fn run_model(
    model: &dyn CashFlowModel,
    context: &AnalysisContext,
    pass: PassNumber,
) -> Result<usize, OrchestrationError> {
    let output = model
        .compute_cf(context)
        .map_err(|source| OrchestrationError::from_producer(model.name(), source))?;

    let ledger = context.ledger();
    let written = match &output {
        CashFlowOutput::Single(series) => {
            ledger.add_series(series, &metadata(model, context, pass, None))?
        }
        CashFlowOutput::Components(parts) => {
            let mut written = 0;
            for (component, series) in parts {
                let tags = metadata(model, context, pass, Some(component.as_str()));
                written += ledger.add_series(series, &tags)?;
            }
            written
        }
    };
    tracing::debug!(
        producer = model.name(),
        source_id = %model.id(),
        pass = u8::from(pass),
        records = written,
        "producer output buffered"
    );
    Ok(written)
}

fn metadata(
    model: &dyn CashFlowModel,
    context: &AnalysisContext,
    pass: PassNumber,
    component: Option<&str>,
) -> SeriesMetadata {
    let (subcategory, item_name) = match component {
        None => (model.subcategory(), model.name().to_string()),
        Some(component) => (
            model.component_subcategory(component),
            format!("{} - {component}", model.name()),
        ),
    };
    let mut metadata = SeriesMetadata::new(
        model.category(),
        subcategory,
        item_name,
        model.id(),
        context.asset_id(),
    )
    .with_pass(pass);
    if let Some(flow_purpose) = model.flow_purpose() {
        metadata = metadata.with_flow_purpose(flow_purpose);
    }
    if let Some(deal_id) = context.deal_id() {
        metadata = metadata.with_deal(deal_id);
    }
    if let Some((entity_id, entity_type)) = model.entity() {
        metadata = metadata.with_entity(entity_id, entity_type);
    }
    metadata
}

/// Queries over the records written since `watermark`.
fn snapshot_queries(
    context: &AnalysisContext,
    watermark: usize,
) -> Result<LedgerQueries, OrchestrationError> {
    let snapshot = context.ledger().snapshot()?.tail(watermark);
    Ok(LedgerQueries::new(snapshot)?.with_timeline(*context.timeline()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FixedSeriesModel, PercentOfAggregateModel};
    use crate::settings::AnalysisSettings;
    use propflow_core::{AssetId, CashFlowCategory, Period, Series, Timeline};

    fn context() -> AnalysisContext {
        AnalysisContext::new(
            Timeline::new(Period::new(2024, 1).unwrap(), 12),
            AnalysisSettings::default(),
            AssetId::new(),
        )
    }

    #[test]
    fn records_are_tagged_with_their_pass() {
        let orchestrator = CashFlowOrchestrator::default()
            .with_model(FixedSeriesModel::constant("Rent", CashFlowCategory::Revenue, "Lease", 1_000.0))
            .with_model(PercentOfAggregateModel::new(
                "Mgmt Fee",
                CashFlowCategory::Expense,
                "OpEx",
                AggregateKey::EffectiveGrossIncome,
                0.03,
            ));
        let mut ctx = context();
        let report = orchestrator.execute(&mut ctx).unwrap();
        assert_eq!(report.pass_one_records, 12);
        assert_eq!(report.pass_two_records, 12);
        assert_eq!(report.committed, 24);
        assert!(report.resolved_keys.contains(&AggregateKey::PotentialGrossRevenue));

        let stats = ctx.ledger().stats().unwrap();
        assert_eq!((stats.pass_one, stats.pass_two), (12, 12));
        assert!(!ctx.ledger().in_transaction().unwrap());
    }

    #[test]
    fn component_outputs_use_component_subcategories() {
        #[derive(Debug)]
        struct Loan(propflow_core::SourceId);

        impl CashFlowModel for Loan {
            fn id(&self) -> propflow_core::SourceId {
                self.0
            }
            fn name(&self) -> &str {
                "Senior Loan"
            }
            fn category(&self) -> CashFlowCategory {
                CashFlowCategory::Financing
            }
            fn subcategory(&self) -> propflow_core::Subcategory {
                propflow_core::Subcategory::InterestPayment
            }
            fn component_subcategory(&self, component: &str) -> propflow_core::Subcategory {
                match component {
                    "principal" => propflow_core::Subcategory::PrincipalPayment,
                    _ => self.subcategory(),
                }
            }
            fn compute_cf(&self, context: &AnalysisContext) -> anyhow::Result<CashFlowOutput> {
                let mut parts = std::collections::BTreeMap::new();
                parts.insert("interest".to_string(), Series::constant(context.timeline(), -400.0));
                parts.insert("principal".to_string(), Series::constant(context.timeline(), -100.0));
                Ok(parts.into())
            }
        }

        let mut ctx = context();
        CashFlowOrchestrator::default()
            .with_model(Loan(propflow_core::SourceId::new()))
            .execute(&mut ctx)
            .unwrap();
        let lookups = ctx.resolved_lookups();
        assert_eq!(lookups[&AggregateKey::InterestPayments].sum(), -4_800.0);
        assert_eq!(lookups[&AggregateKey::PrincipalPayments].sum(), -1_200.0);
        assert_eq!(lookups[&AggregateKey::DebtService].sum(), -6_000.0);
        let names: BTreeSet<String> = ctx
            .ledger()
            .snapshot()
            .unwrap()
            .iter()
            .map(|r| r.item_name.clone())
            .collect();
        assert!(names.contains("Senior Loan - principal"));
    }

    #[test]
    fn nested_run_is_rejected_without_touching_open_transaction() {
        let mut ctx = context();
        let ledger = ctx.ledger().clone();
        let outer = ledger.begin().unwrap();
        let err = CashFlowOrchestrator::default()
            .with_model(FixedSeriesModel::constant("Rent", CashFlowCategory::Revenue, "Lease", 1.0))
            .execute(&mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            OrchestrationError::Ledger(propflow_ledger::LedgerError::NestedTransaction)
        ));
        assert!(ledger.in_transaction().unwrap());
        outer.rollback();
    }
}
