//! The producer contract.

use std::collections::BTreeMap;

use propflow_analysis::AggregateKey;
use propflow_core::{
    CashFlowCategory, EntityId, EntityType, FlowPurpose, Series, SourceId, Subcategory,
};

use crate::context::AnalysisContext;

/// What a producer computed: one series, or named component series.
#[derive(Debug, Clone, PartialEq)]
pub enum CashFlowOutput {
    Single(Series),
    Components(BTreeMap<String, Series>),
}

impl CashFlowOutput {
    /// Pointwise sum of every series.
    pub fn total(&self) -> Series {
        match self {
            CashFlowOutput::Single(series) => series.clone(),
            CashFlowOutput::Components(parts) => {
                parts.values().flat_map(|s| s.iter()).collect()
            }
        }
    }
}

impl From<Series> for CashFlowOutput {
    fn from(series: Series) -> Self {
        CashFlowOutput::Single(series)
    }
}

impl From<BTreeMap<String, Series>> for CashFlowOutput {
    fn from(parts: BTreeMap<String, Series>) -> Self {
        CashFlowOutput::Components(parts)
    }
}

/// A source of cash flows: a lease, an expense line, a loan, a fee.
///
/// Producers are computed by the orchestrator and never write to the ledger
/// themselves. A producer with a [`reference`](CashFlowModel::reference) is
/// *dependent*: it runs in the second pass and may read that aggregate (and its
/// components) from the context, as computed from independent producers only.
pub trait CashFlowModel: Send + Sync + std::fmt::Debug {
    /// Stable identity, written to every record as `source_id`.
    fn id(&self) -> SourceId;

    fn name(&self) -> &str;

    fn category(&self) -> CashFlowCategory;

    fn subcategory(&self) -> Subcategory;

    /// Aggregate this producer reads, if any.
    fn reference(&self) -> Option<AggregateKey> {
        None
    }

    /// Subcategory for a named component of a [`CashFlowOutput::Components`] output.
    fn component_subcategory(&self, _component: &str) -> Subcategory {
        self.subcategory()
    }

    /// Explicit flow purpose. `None` infers it per record from category, subcategory
    /// and sign.
    fn flow_purpose(&self) -> Option<FlowPurpose> {
        None
    }

    /// Partner tagging for distributions, contributions and promotes.
    fn entity(&self) -> Option<(EntityId, EntityType)> {
        None
    }

    fn compute_cf(&self, context: &AnalysisContext) -> anyhow::Result<CashFlowOutput>;
}
