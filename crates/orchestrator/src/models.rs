//! Generic producers for wiring and testing runs.
//!
//! Domain producers (leases, loans, waterfalls) live with their callers; these two
//! cover fixed schedules and percentage-of-aggregate fees.

use anyhow::Context as _;

use propflow_analysis::AggregateKey;
use propflow_core::{
    CashFlowCategory, EntityId, EntityType, FlowPurpose, Series, SourceId, Subcategory,
};

use crate::context::AnalysisContext;
use crate::model::{CashFlowModel, CashFlowOutput};

#[derive(Debug, Clone)]
enum Schedule {
    Fixed(Series),
    /// Same amount every timeline period.
    Constant(f64),
}

/// Posts a predetermined schedule. Always independent.
#[derive(Debug, Clone)]
pub struct FixedSeriesModel {
    id: SourceId,
    name: String,
    category: CashFlowCategory,
    subcategory: Subcategory,
    schedule: Schedule,
    flow_purpose: Option<FlowPurpose>,
    entity: Option<(EntityId, EntityType)>,
}

impl FixedSeriesModel {
    pub fn new(
        name: impl Into<String>,
        category: CashFlowCategory,
        subcategory: impl Into<Subcategory>,
        series: Series,
    ) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            category,
            subcategory: subcategory.into(),
            schedule: Schedule::Fixed(series),
            flow_purpose: None,
            entity: None,
        }
    }

    /// `amount` in every period of the run's timeline.
    pub fn constant(
        name: impl Into<String>,
        category: CashFlowCategory,
        subcategory: impl Into<Subcategory>,
        amount: f64,
    ) -> Self {
        Self {
            schedule: Schedule::Constant(amount),
            ..Self::new(name, category, subcategory, Series::new())
        }
    }

    pub fn with_id(mut self, id: SourceId) -> Self {
        self.id = id;
        self
    }

    pub fn with_entity(mut self, entity_id: EntityId, entity_type: EntityType) -> Self {
        self.entity = Some((entity_id, entity_type));
        self
    }

    pub fn with_flow_purpose(mut self, flow_purpose: FlowPurpose) -> Self {
        self.flow_purpose = Some(flow_purpose);
        self
    }
}

impl CashFlowModel for FixedSeriesModel {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> CashFlowCategory {
        self.category
    }

    fn subcategory(&self) -> Subcategory {
        self.subcategory.clone()
    }

    fn flow_purpose(&self) -> Option<FlowPurpose> {
        self.flow_purpose
    }

    fn entity(&self) -> Option<(EntityId, EntityType)> {
        self.entity
    }

    fn compute_cf(&self, context: &AnalysisContext) -> anyhow::Result<CashFlowOutput> {
        let series = match &self.schedule {
            Schedule::Fixed(series) => series.clone(),
            Schedule::Constant(amount) => Series::constant(context.timeline(), *amount),
        };
        Ok(series.into())
    }
}

/// `sign × rate × |aggregate|` per period, e.g. a management fee on EGI.
///
/// Dependent on its aggregate. Posts negative (a cost) unless built with
/// [`as_income`](Self::as_income).
#[derive(Debug, Clone)]
pub struct PercentOfAggregateModel {
    id: SourceId,
    name: String,
    category: CashFlowCategory,
    subcategory: Subcategory,
    reference: AggregateKey,
    rate: f64,
    /// Settings parameter overriding `rate` when present.
    rate_param: Option<String>,
    sign: f64,
}

impl PercentOfAggregateModel {
    pub fn new(
        name: impl Into<String>,
        category: CashFlowCategory,
        subcategory: impl Into<Subcategory>,
        reference: AggregateKey,
        rate: f64,
    ) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            category,
            subcategory: subcategory.into(),
            reference,
            rate,
            rate_param: None,
            sign: -1.0,
        }
    }

    pub fn as_income(mut self) -> Self {
        self.sign = 1.0;
        self
    }

    /// Read the rate from `settings.params[name]`, keeping the built-in rate as default.
    pub fn with_rate_param(mut self, name: impl Into<String>) -> Self {
        self.rate_param = Some(name.into());
        self
    }

    fn rate(&self, context: &AnalysisContext) -> anyhow::Result<f64> {
        let Some(name) = &self.rate_param else {
            return Ok(self.rate);
        };
        let rate = context
            .settings()
            .param::<f64>(name)
            .with_context(|| format!("parameter '{name}' is not a number"))?;
        Ok(rate.unwrap_or(self.rate))
    }
}

impl CashFlowModel for PercentOfAggregateModel {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> CashFlowCategory {
        self.category
    }

    fn subcategory(&self) -> Subcategory {
        self.subcategory.clone()
    }

    fn reference(&self) -> Option<AggregateKey> {
        Some(self.reference)
    }

    fn compute_cf(&self, context: &AnalysisContext) -> anyhow::Result<CashFlowOutput> {
        let rate = self.rate(context)?;
        if !rate.is_finite() {
            anyhow::bail!("rate {rate} is not finite");
        }
        let base = context.lookup(self.reference)?;
        Ok(base.abs().scale(self.sign * rate).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AnalysisSettings;
    use propflow_analysis::AggregateLookupError;
    use propflow_core::{AssetId, Period, Timeline};
    use serde_json::json;

    fn context(settings: AnalysisSettings) -> AnalysisContext {
        AnalysisContext::new(
            Timeline::new(Period::new(2024, 1).unwrap(), 3),
            settings,
            AssetId::new(),
        )
    }

    #[test]
    fn constant_schedule_covers_timeline() {
        let model = FixedSeriesModel::constant("Rent", CashFlowCategory::Revenue, "Lease", 100.0);
        let out = model.compute_cf(&context(AnalysisSettings::default())).unwrap();
        assert_eq!(out.total().len(), 3);
        assert_eq!(out.total().sum(), 300.0);
        assert_eq!(model.reference(), None);
    }

    #[test]
    fn percent_model_is_dependent_and_fails_before_resolution() {
        let model = PercentOfAggregateModel::new(
            "Mgmt Fee",
            CashFlowCategory::Expense,
            "OpEx",
            AggregateKey::EffectiveGrossIncome,
            0.05,
        );
        assert_eq!(model.reference(), Some(AggregateKey::EffectiveGrossIncome));
        let err = model.compute_cf(&context(AnalysisSettings::default())).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AggregateLookupError>(),
            Some(&AggregateLookupError::NotResolved(AggregateKey::EffectiveGrossIncome))
        );
    }

    #[test]
    fn percent_model_scales_magnitude() {
        let mut ctx = context(AnalysisSettings::default().with_param("fee", json!(0.1)));
        let opex = Series::constant(ctx.timeline(), -1_000.0);
        ctx.resolved_lookups
            .insert(AggregateKey::TotalOperatingExpenses, opex);
        let model = PercentOfAggregateModel::new(
            "Asset Mgmt",
            CashFlowCategory::Expense,
            "OpEx",
            AggregateKey::TotalOperatingExpenses,
            0.05,
        );
        assert_eq!(model.compute_cf(&ctx).unwrap().total().sum(), -150.0);
        let model = model.with_rate_param("fee");
        assert_eq!(model.compute_cf(&ctx).unwrap().total().sum(), -300.0);
        let model = model.as_income();
        assert_eq!(model.compute_cf(&ctx).unwrap().total().sum(), 300.0);
    }
}
