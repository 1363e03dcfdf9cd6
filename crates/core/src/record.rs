//! Ledger records and the tags attached to them.
//!
//! Sign convention: positive amounts are inflows/benefits, negative amounts are
//! outflows/costs. Losses (vacancy, credit, abatement) are posted negative too.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::{AssetId, DealId, EntityId, SourceId, TransactionId};
use crate::period::Period;

/// Coarse purpose tag: selects which top-level buckets a record feeds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlowPurpose {
    #[serde(rename = "Operating")]
    Operating,
    #[serde(rename = "Capital Use")]
    CapitalUse,
    #[serde(rename = "Capital Source")]
    CapitalSource,
    #[serde(rename = "Financing Service")]
    FinancingService,
    /// Non-cash marks (appraisals, exit values). Never part of a cash total.
    #[serde(rename = "Valuation")]
    Valuation,
}

impl FlowPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowPurpose::Operating => "Operating",
            FlowPurpose::CapitalUse => "Capital Use",
            FlowPurpose::CapitalSource => "Capital Source",
            FlowPurpose::FinancingService => "Financing Service",
            FlowPurpose::Valuation => "Valuation",
        }
    }

    /// Purpose of a record whose metadata did not pin one explicitly.
    ///
    /// Capital flows split on sign: spending is a use, proceeds are a source.
    pub fn infer(category: CashFlowCategory, subcategory: &Subcategory, amount: f64) -> Self {
        match category {
            CashFlowCategory::Revenue => FlowPurpose::Operating,
            CashFlowCategory::Expense => match subcategory {
                Subcategory::CapEx => FlowPurpose::CapitalUse,
                _ => FlowPurpose::Operating,
            },
            CashFlowCategory::Capital => {
                if amount < 0.0 {
                    FlowPurpose::CapitalUse
                } else {
                    FlowPurpose::CapitalSource
                }
            }
            CashFlowCategory::Financing => match subcategory {
                Subcategory::LoanProceeds
                | Subcategory::RefinancingProceeds
                | Subcategory::EquityContribution => FlowPurpose::CapitalSource,
                _ => FlowPurpose::FinancingService,
            },
            CashFlowCategory::Valuation => FlowPurpose::Valuation,
        }
    }
}

impl core::fmt::Display for FlowPurpose {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level cash-flow category.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CashFlowCategory {
    Revenue,
    Expense,
    Capital,
    Financing,
    Valuation,
}

impl CashFlowCategory {
    pub const ALL: [CashFlowCategory; 5] = [
        CashFlowCategory::Revenue,
        CashFlowCategory::Expense,
        CashFlowCategory::Capital,
        CashFlowCategory::Financing,
        CashFlowCategory::Valuation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CashFlowCategory::Revenue => "Revenue",
            CashFlowCategory::Expense => "Expense",
            CashFlowCategory::Capital => "Capital",
            CashFlowCategory::Financing => "Financing",
            CashFlowCategory::Valuation => "Valuation",
        }
    }
}

impl core::fmt::Display for CashFlowCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained record type.
///
/// Known types get their own variant; anything else is carried verbatim in
/// [`Subcategory::Other`]. Serialized as its display label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Subcategory {
    // Revenue
    Lease,
    Misc,
    Recovery,
    VacancyLoss,
    CreditLoss,
    Abatement,
    // Expense
    OpEx,
    CapEx,
    // Capital
    PurchasePrice,
    ClosingCosts,
    TransactionCosts,
    HardCosts,
    SoftCosts,
    TenantImprovements,
    LeasingCommissions,
    SaleProceeds,
    // Financing
    LoanProceeds,
    RefinancingProceeds,
    InterestPayment,
    PrincipalPayment,
    RefinancingPayoff,
    PrepaymentPenalty,
    EquityContribution,
    Distribution,
    // Valuation
    AssetValuation,
    Other(String),
}

impl Subcategory {
    pub fn as_str(&self) -> &str {
        match self {
            Subcategory::Lease => "Lease",
            Subcategory::Misc => "Misc",
            Subcategory::Recovery => "Recovery",
            Subcategory::VacancyLoss => "Vacancy Loss",
            Subcategory::CreditLoss => "Credit Loss",
            Subcategory::Abatement => "Abatement",
            Subcategory::OpEx => "OpEx",
            Subcategory::CapEx => "CapEx",
            Subcategory::PurchasePrice => "Purchase Price",
            Subcategory::ClosingCosts => "Closing Costs",
            Subcategory::TransactionCosts => "Transaction Costs",
            Subcategory::HardCosts => "Hard Costs",
            Subcategory::SoftCosts => "Soft Costs",
            Subcategory::TenantImprovements => "Tenant Improvements",
            Subcategory::LeasingCommissions => "Leasing Commissions",
            Subcategory::SaleProceeds => "Sale Proceeds",
            Subcategory::LoanProceeds => "Loan Proceeds",
            Subcategory::RefinancingProceeds => "Refinancing Proceeds",
            Subcategory::InterestPayment => "Interest Payment",
            Subcategory::PrincipalPayment => "Principal Payment",
            Subcategory::RefinancingPayoff => "Refinancing Payoff",
            Subcategory::PrepaymentPenalty => "Prepayment Penalty",
            Subcategory::EquityContribution => "Equity Contribution",
            Subcategory::Distribution => "Distribution",
            Subcategory::AssetValuation => "Asset Valuation",
            Subcategory::Other(label) => label.as_str(),
        }
    }

    /// Revenue reductions posted as negative revenue.
    pub fn is_revenue_loss(&self) -> bool {
        matches!(
            self,
            Subcategory::VacancyLoss | Subcategory::CreditLoss | Subcategory::Abatement
        )
    }

    /// True for the free-form variant, which is what legacy name matching applies to.
    pub fn is_generic(&self) -> bool {
        matches!(self, Subcategory::Other(_))
    }
}

impl From<&str> for Subcategory {
    fn from(value: &str) -> Self {
        match value {
            "Lease" => Subcategory::Lease,
            "Misc" => Subcategory::Misc,
            "Recovery" => Subcategory::Recovery,
            "Vacancy Loss" => Subcategory::VacancyLoss,
            "Credit Loss" => Subcategory::CreditLoss,
            "Abatement" => Subcategory::Abatement,
            "OpEx" => Subcategory::OpEx,
            "CapEx" => Subcategory::CapEx,
            "Purchase Price" => Subcategory::PurchasePrice,
            "Closing Costs" => Subcategory::ClosingCosts,
            "Transaction Costs" => Subcategory::TransactionCosts,
            "Hard Costs" => Subcategory::HardCosts,
            "Soft Costs" => Subcategory::SoftCosts,
            "Tenant Improvements" => Subcategory::TenantImprovements,
            "Leasing Commissions" => Subcategory::LeasingCommissions,
            "Sale Proceeds" => Subcategory::SaleProceeds,
            "Loan Proceeds" => Subcategory::LoanProceeds,
            "Refinancing Proceeds" => Subcategory::RefinancingProceeds,
            "Interest Payment" => Subcategory::InterestPayment,
            "Principal Payment" => Subcategory::PrincipalPayment,
            "Refinancing Payoff" => Subcategory::RefinancingPayoff,
            "Prepayment Penalty" => Subcategory::PrepaymentPenalty,
            "Equity Contribution" => Subcategory::EquityContribution,
            "Distribution" => Subcategory::Distribution,
            "Asset Valuation" => Subcategory::AssetValuation,
            other => Subcategory::Other(other.to_string()),
        }
    }
}

impl From<String> for Subcategory {
    fn from(value: String) -> Self {
        Subcategory::from(value.as_str())
    }
}

impl From<Subcategory> for String {
    fn from(value: Subcategory) -> Self {
        match value {
            Subcategory::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl core::fmt::Display for Subcategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a partner entity in a deal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "GP")]
    GeneralPartner,
    #[serde(rename = "LP")]
    LimitedPartner,
    #[serde(rename = "Third Party")]
    ThirdParty,
}

/// Orchestration phase that wrote a record (debugging/ordering only).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PassNumber {
    /// Pass 1: producers without an aggregate reference.
    Independent = 1,
    /// Pass 2: producers reading an aggregate built in pass 1.
    Dependent = 2,
}

impl TryFrom<u8> for PassNumber {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(PassNumber::Independent),
            2 => Ok(PassNumber::Dependent),
            other => Err(DomainError::validation(format!(
                "pass number must be 1 or 2 (got {other})"
            ))),
        }
    }
}

impl From<PassNumber> for u8 {
    fn from(value: PassNumber) -> Self {
        value as u8
    }
}

/// Tags applied to every record exploded from one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub category: CashFlowCategory,
    pub subcategory: Subcategory,
    pub item_name: String,
    pub source_id: SourceId,
    pub asset_id: AssetId,
    pub pass_num: PassNumber,
    /// Explicit purpose; inferred per record from category/subcategory/sign when unset.
    pub flow_purpose: Option<FlowPurpose>,
    pub deal_id: Option<DealId>,
    pub entity_id: Option<EntityId>,
    pub entity_type: Option<EntityType>,
}

impl SeriesMetadata {
    pub fn new(
        category: CashFlowCategory,
        subcategory: impl Into<Subcategory>,
        item_name: impl Into<String>,
        source_id: SourceId,
        asset_id: AssetId,
    ) -> Self {
        Self {
            category,
            subcategory: subcategory.into(),
            item_name: item_name.into(),
            source_id,
            asset_id,
            pass_num: PassNumber::Independent,
            flow_purpose: None,
            deal_id: None,
            entity_id: None,
            entity_type: None,
        }
    }

    pub fn with_pass(mut self, pass_num: PassNumber) -> Self {
        self.pass_num = pass_num;
        self
    }

    pub fn with_flow_purpose(mut self, flow_purpose: FlowPurpose) -> Self {
        self.flow_purpose = Some(flow_purpose);
        self
    }

    pub fn with_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn with_entity(mut self, entity_id: EntityId, entity_type: EntityType) -> Self {
        self.entity_id = Some(entity_id);
        self.entity_type = Some(entity_type);
        self
    }

    /// Build one record dated `date` with a fresh transaction id.
    pub fn record(&self, date: NaiveDate, amount: f64) -> DomainResult<TransactionRecord> {
        let flow_purpose = self
            .flow_purpose
            .unwrap_or_else(|| FlowPurpose::infer(self.category, &self.subcategory, amount));

        let record = TransactionRecord {
            transaction_id: TransactionId::new(),
            date,
            amount,
            flow_purpose,
            category: self.category,
            subcategory: self.subcategory.clone(),
            item_name: self.item_name.clone(),
            source_id: self.source_id,
            asset_id: self.asset_id,
            pass_num: self.pass_num,
            deal_id: self.deal_id,
            entity_id: self.entity_id,
            entity_type: self.entity_type,
        };
        record.validate()?;
        Ok(record)
    }
}

/// The atomic ledger entry: one dated, signed, tagged amount.
///
/// Records are immutable once committed; corrections are new offsetting records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub date: NaiveDate,
    pub amount: f64,
    pub flow_purpose: FlowPurpose,
    pub category: CashFlowCategory,
    pub subcategory: Subcategory,
    pub item_name: String,
    pub source_id: SourceId,
    pub asset_id: AssetId,
    pub pass_num: PassNumber,
    #[serde(default)]
    pub deal_id: Option<DealId>,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub entity_type: Option<EntityType>,
}

impl TransactionRecord {
    /// Month the record falls in.
    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !self.amount.is_finite() {
            return Err(DomainError::validation(format!(
                "amount for '{}' on {} is not finite ({})",
                self.item_name, self.date, self.amount
            )));
        }
        if self.item_name.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "record {} has an empty item_name",
                self.transaction_id
            )));
        }
        Ok(())
    }
}
