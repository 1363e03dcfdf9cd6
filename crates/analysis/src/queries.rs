//! Read model over a ledger snapshot.
//!
//! `LedgerQueries` is the only place that knows how records roll up into
//! financial totals. Every public aggregate is a pure function of the snapshot
//! (and the optional zero-fill timeline): same snapshot in, same series out.
//!
//! Sign convention is the ledger's: inflows positive, outflows negative.
//! Aggregates documented as magnitudes (`operating_expenses`, `capital_expenditures`,
//! `total_capital_uses`, ...) are reported positive.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use propflow_core::{
    BreakdownTable, CashFlowCategory, DealId, EntityId, EntityType, FlowPurpose, Period, Series,
    Subcategory, Timeline, TransactionRecord,
};
use propflow_ledger::LedgerSnapshot;

use crate::error::SchemaError;
use crate::key::AggregateKey;
use crate::legacy::{is_leasing_commission, is_tenant_improvement};

/// Fields every exported ledger row must carry.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "transaction_id",
    "date",
    "amount",
    "flow_purpose",
    "category",
    "subcategory",
    "item_name",
    "source_id",
    "asset_id",
    "pass_num",
];

#[derive(Debug, Clone)]
pub struct LedgerQueries {
    snapshot: LedgerSnapshot,
    /// Periods every aggregate is zero-filled over.
    fill: Option<Timeline>,
    explicit_timeline: bool,
}

impl LedgerQueries {
    /// Validate `snapshot` and build a query object over it.
    pub fn new(snapshot: LedgerSnapshot) -> Result<Self, SchemaError> {
        for record in snapshot.iter() {
            record
                .validate()
                .map_err(|e| SchemaError::InvalidRecord {
                    transaction_id: record.transaction_id,
                    reason: e.to_string(),
                })?;
        }
        let fill = snapshot
            .period_span()
            .and_then(|(first, last)| Timeline::from_range(first, last).ok());
        Ok(Self {
            snapshot,
            fill,
            explicit_timeline: false,
        })
    }

    /// Build from rows exported by [`LedgerSnapshot::to_json`] (or any tool
    /// producing the same shape).
    pub fn from_json_rows(rows: &JsonValue) -> Result<Self, SchemaError> {
        let rows = rows.as_array().ok_or(SchemaError::NotTabular)?;
        let mut records = Vec::with_capacity(rows.len());
        for (row, value) in rows.iter().enumerate() {
            let object = value.as_object().ok_or_else(|| SchemaError::MalformedRow {
                row,
                reason: "row is not an object".to_string(),
            })?;
            let missing: Vec<&'static str> = REQUIRED_FIELDS
                .iter()
                .copied()
                .filter(|field| object.get(*field).is_none_or(JsonValue::is_null))
                .collect();
            if !missing.is_empty() {
                return Err(SchemaError::MissingFields { row, missing });
            }
            let record: TransactionRecord =
                serde_json::from_value(value.clone()).map_err(|e| SchemaError::MalformedRow {
                    row,
                    reason: e.to_string(),
                })?;
            records.push(record);
        }
        Self::new(LedgerSnapshot::from_records(records))
    }

    /// Zero-fill every aggregate over `timeline` instead of the data span.
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.fill = Some(timeline);
        self.explicit_timeline = true;
        self
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    /// Periods aggregates are reported over, if any.
    pub fn timeline(&self) -> Option<Timeline> {
        self.fill
    }

    pub fn has_explicit_timeline(&self) -> bool {
        self.explicit_timeline
    }

    /// Dispatch `key` to its aggregation function.
    pub fn aggregate(&self, key: AggregateKey) -> Series {
        match key {
            AggregateKey::PotentialGrossRevenue => self.potential_gross_revenue(),
            AggregateKey::GrossPotentialRent => self.gross_potential_rent(),
            AggregateKey::MiscIncome => self.misc_income(),
            AggregateKey::TenantReimbursements => self.tenant_reimbursements(),
            AggregateKey::VacancyLoss => self.vacancy_loss(),
            AggregateKey::CreditLoss => self.credit_loss(),
            AggregateKey::RentalAbatement => self.rental_abatement(),
            AggregateKey::EffectiveGrossIncome => self.effective_gross_income(),
            AggregateKey::TotalOperatingExpenses => self.total_operating_expenses(),
            AggregateKey::OperatingExpenses => self.operating_expenses(),
            AggregateKey::CapitalExpenditures => self.capital_expenditures(),
            AggregateKey::TenantImprovements => self.tenant_improvements(),
            AggregateKey::LeasingCommissions => self.leasing_commissions(),
            AggregateKey::NetOperatingIncome => self.net_operating_income(),
            AggregateKey::TotalCapitalUses => self.total_capital_uses(),
            AggregateKey::TotalCapitalSources => self.total_capital_sources(),
            AggregateKey::DispositionProceeds => self.disposition_proceeds(),
            AggregateKey::UnleveredCashFlow => self.unlevered_cash_flow(),
            AggregateKey::DebtDraws => self.debt_draws(),
            AggregateKey::DebtService => self.debt_service(),
            AggregateKey::InterestPayments => self.interest_payments(),
            AggregateKey::PrincipalPayments => self.principal_payments(),
            AggregateKey::EquityContributions => self.equity_contributions(),
            AggregateKey::LeveredCashFlow => self.levered_cash_flow(),
            AggregateKey::AssetValuations => self.asset_valuations(),
        }
    }

    pub fn aggregates(
        &self,
        keys: impl IntoIterator<Item = AggregateKey>,
    ) -> BTreeMap<AggregateKey, Series> {
        keys.into_iter().map(|k| (k, self.aggregate(k))).collect()
    }

    /// Signed per-period sum of every record matching `predicate`, zero-filled.
    pub fn sum_where(&self, predicate: impl Fn(&TransactionRecord) -> bool) -> Series {
        let series: Series = self
            .snapshot
            .iter()
            .filter(|r| predicate(r))
            .map(|r| (r.period(), r.amount))
            .collect();
        self.fill(series)
    }

    fn fill(&self, series: Series) -> Series {
        match &self.fill {
            Some(timeline) => series.zero_filled(timeline),
            None => series,
        }
    }

    fn fill_table(&self, table: BreakdownTable) -> BreakdownTable {
        match &self.fill {
            Some(timeline) => table.zero_filled(timeline),
            None => table,
        }
    }

    fn breakdown(
        &self,
        predicate: impl Fn(&TransactionRecord) -> bool,
        column: impl Fn(&TransactionRecord) -> String,
    ) -> BreakdownTable {
        let mut table = BreakdownTable::new();
        for record in self.snapshot.iter().filter(|r| predicate(r)) {
            table.accumulate(column(record), record.period(), record.amount);
        }
        self.fill_table(table)
    }

    // --- Revenue ---------------------------------------------------------

    fn revenue(&self, predicate: impl Fn(&Subcategory) -> bool) -> Series {
        self.sum_where(|r| is_operating_revenue(r) && predicate(&r.subcategory))
    }

    /// Revenue before losses and reimbursements.
    pub fn potential_gross_revenue(&self) -> Series {
        self.revenue(|s| !s.is_revenue_loss() && *s != Subcategory::Recovery)
    }

    pub fn gross_potential_rent(&self) -> Series {
        self.revenue(|s| *s == Subcategory::Lease)
    }

    /// Non-rent, non-loss, non-recovery revenue (free-form revenue lines included).
    pub fn misc_income(&self) -> Series {
        self.revenue(|s| {
            *s != Subcategory::Lease && *s != Subcategory::Recovery && !s.is_revenue_loss()
        })
    }

    pub fn tenant_reimbursements(&self) -> Series {
        self.revenue(|s| *s == Subcategory::Recovery)
    }

    /// Negative, as posted.
    pub fn vacancy_loss(&self) -> Series {
        self.revenue(|s| *s == Subcategory::VacancyLoss)
    }

    pub fn credit_loss(&self) -> Series {
        self.revenue(|s| *s == Subcategory::CreditLoss)
    }

    pub fn rental_abatement(&self) -> Series {
        self.revenue(|s| *s == Subcategory::Abatement)
    }

    /// PGR + losses + reimbursements, i.e. every operating revenue flow.
    pub fn effective_gross_income(&self) -> Series {
        self.revenue(|_| true)
    }

    // --- Expense ---------------------------------------------------------

    /// Signed (negative) operating expenses.
    pub fn total_operating_expenses(&self) -> Series {
        self.sum_where(is_operating_expense)
    }

    pub fn operating_expenses(&self) -> Series {
        self.sum_where(|r| is_operating_expense(r) && r.subcategory == Subcategory::OpEx)
            .abs()
    }

    /// Signed operating expenses by item name.
    pub fn operating_expense_breakdown(&self) -> BreakdownTable {
        self.breakdown(is_operating_expense, |r| r.item_name.clone())
    }

    pub fn capital_expenditures(&self) -> Series {
        self.sum_where(|r| {
            r.flow_purpose == FlowPurpose::CapitalUse
                && !is_tenant_improvement(r)
                && !is_leasing_commission(r)
        })
        .abs()
    }

    pub fn tenant_improvements(&self) -> Series {
        self.sum_where(|r| r.flow_purpose == FlowPurpose::CapitalUse && is_tenant_improvement(r))
            .abs()
    }

    pub fn leasing_commissions(&self) -> Series {
        self.sum_where(|r| r.flow_purpose == FlowPurpose::CapitalUse && is_leasing_commission(r))
            .abs()
    }

    // --- Derived ---------------------------------------------------------

    pub fn net_operating_income(&self) -> Series {
        &self.effective_gross_income() + &self.total_operating_expenses()
    }

    /// Positive magnitude of capital spending.
    pub fn total_capital_uses(&self) -> Series {
        -&self.sum_where(|r| r.flow_purpose == FlowPurpose::CapitalUse)
    }

    /// Positive magnitudes by subcategory; columns sum to [`total_capital_uses`](Self::total_capital_uses).
    pub fn capital_uses_breakdown(&self) -> BreakdownTable {
        self.breakdown(
            |r| r.flow_purpose == FlowPurpose::CapitalUse,
            |r| r.subcategory.to_string(),
        )
        .map(|v| -v)
    }

    pub fn total_capital_sources(&self) -> Series {
        self.sum_where(|r| r.flow_purpose == FlowPurpose::CapitalSource)
    }

    pub fn capital_sources_breakdown(&self) -> BreakdownTable {
        self.breakdown(
            |r| r.flow_purpose == FlowPurpose::CapitalSource,
            |r| r.subcategory.to_string(),
        )
    }

    pub fn disposition_proceeds(&self) -> Series {
        self.sum_where(|r| r.subcategory == Subcategory::SaleProceeds)
    }

    /// NOI, less capital spending, plus sale proceeds.
    pub fn unlevered_cash_flow(&self) -> Series {
        let uses = self.sum_where(|r| r.flow_purpose == FlowPurpose::CapitalUse);
        &(&self.net_operating_income() + &uses) + &self.disposition_proceeds()
    }

    pub fn debt_draws(&self) -> Series {
        self.sum_where(|r| {
            matches!(
                r.subcategory,
                Subcategory::LoanProceeds | Subcategory::RefinancingProceeds
            )
        })
    }

    /// Signed financing service, excluding partner distributions and payoffs.
    pub fn debt_service(&self) -> Series {
        self.sum_where(|r| {
            r.flow_purpose == FlowPurpose::FinancingService
                && !matches!(
                    r.subcategory,
                    Subcategory::Distribution | Subcategory::RefinancingPayoff
                )
        })
    }

    pub fn interest_payments(&self) -> Series {
        self.sum_where(|r| {
            r.flow_purpose == FlowPurpose::FinancingService
                && r.subcategory == Subcategory::InterestPayment
        })
    }

    pub fn principal_payments(&self) -> Series {
        self.sum_where(|r| {
            r.flow_purpose == FlowPurpose::FinancingService
                && r.subcategory == Subcategory::PrincipalPayment
        })
    }

    pub fn refinancing_payoffs(&self) -> Series {
        self.sum_where(|r| r.subcategory == Subcategory::RefinancingPayoff)
    }

    pub fn equity_contributions(&self) -> Series {
        self.sum_where(|r| r.subcategory == Subcategory::EquityContribution)
    }

    pub fn levered_cash_flow(&self) -> Series {
        let financed = &(&self.debt_draws() + &self.debt_service()) + &self.refinancing_payoffs();
        &self.unlevered_cash_flow() + &financed
    }

    // --- Valuation -------------------------------------------------------

    fn valuations(&self) -> impl Iterator<Item = &TransactionRecord> + '_ {
        self.snapshot
            .iter()
            .filter(|r| r.flow_purpose == FlowPurpose::Valuation)
    }

    /// Latest mark in each period that has one. Not summed, not zero-filled.
    pub fn asset_valuations(&self) -> Series {
        let mut latest: BTreeMap<Period, &TransactionRecord> = BTreeMap::new();
        for record in self.valuations() {
            let period = record.period();
            match latest.get(&period) {
                Some(current) if current.date > record.date => {}
                _ => {
                    latest.insert(period, record);
                }
            }
        }
        let mut out = Series::new();
        for (period, record) in latest {
            out.insert(period, record.amount);
        }
        out
    }

    /// Latest mark at or before `period`.
    pub fn valuation_at(&self, period: Period) -> Option<f64> {
        self.asset_valuations()
            .iter()
            .filter(|(p, _)| *p <= period)
            .last()
            .map(|(_, v)| v)
    }

    // --- Slices ----------------------------------------------------------

    /// Signed cash flow per category. Valuation marks are excluded.
    pub fn cash_flow_by_category(&self) -> BreakdownTable {
        self.breakdown(
            |r| r.category != CashFlowCategory::Valuation,
            |r| r.category.as_str().to_string(),
        )
    }

    /// Cash flows tagged with `entity_id`.
    pub fn partner_flows(&self, entity_id: EntityId) -> Series {
        self.sum_where(|r| is_cash(r) && r.entity_id == Some(entity_id))
    }

    pub fn flows_by_entity_type(&self, entity_type: EntityType) -> Series {
        self.sum_where(|r| is_cash(r) && r.entity_type == Some(entity_type))
    }

    pub fn deal_flows(&self, deal_id: DealId) -> Series {
        self.sum_where(|r| is_cash(r) && r.deal_id == Some(deal_id))
    }
}

fn is_cash(record: &TransactionRecord) -> bool {
    record.flow_purpose != FlowPurpose::Valuation
}

fn is_operating_revenue(record: &TransactionRecord) -> bool {
    record.category == CashFlowCategory::Revenue && record.flow_purpose == FlowPurpose::Operating
}

fn is_operating_expense(record: &TransactionRecord) -> bool {
    record.category == CashFlowCategory::Expense && record.flow_purpose == FlowPurpose::Operating
}
