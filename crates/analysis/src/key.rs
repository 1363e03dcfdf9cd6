//! The closed aggregate vocabulary.
//!
//! Adding an aggregate means adding a variant here and one function on
//! [`LedgerQueries`](crate::LedgerQueries); nothing else changes.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AggregateLookupError;

/// Name of one financial total computable from the transaction set.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AggregateKey {
    PotentialGrossRevenue,
    GrossPotentialRent,
    MiscIncome,
    TenantReimbursements,
    VacancyLoss,
    CreditLoss,
    RentalAbatement,
    EffectiveGrossIncome,
    /// Signed (negative) sum of operating expense flows.
    TotalOperatingExpenses,
    /// Magnitude of Expense/OpEx flows.
    OperatingExpenses,
    CapitalExpenditures,
    TenantImprovements,
    LeasingCommissions,
    NetOperatingIncome,
    TotalCapitalUses,
    TotalCapitalSources,
    DispositionProceeds,
    UnleveredCashFlow,
    DebtDraws,
    DebtService,
    InterestPayments,
    PrincipalPayments,
    EquityContributions,
    LeveredCashFlow,
    AssetValuations,
}

impl AggregateKey {
    pub const ALL: [AggregateKey; 25] = [
        AggregateKey::PotentialGrossRevenue,
        AggregateKey::GrossPotentialRent,
        AggregateKey::MiscIncome,
        AggregateKey::TenantReimbursements,
        AggregateKey::VacancyLoss,
        AggregateKey::CreditLoss,
        AggregateKey::RentalAbatement,
        AggregateKey::EffectiveGrossIncome,
        AggregateKey::TotalOperatingExpenses,
        AggregateKey::OperatingExpenses,
        AggregateKey::CapitalExpenditures,
        AggregateKey::TenantImprovements,
        AggregateKey::LeasingCommissions,
        AggregateKey::NetOperatingIncome,
        AggregateKey::TotalCapitalUses,
        AggregateKey::TotalCapitalSources,
        AggregateKey::DispositionProceeds,
        AggregateKey::UnleveredCashFlow,
        AggregateKey::DebtDraws,
        AggregateKey::DebtService,
        AggregateKey::InterestPayments,
        AggregateKey::PrincipalPayments,
        AggregateKey::EquityContributions,
        AggregateKey::LeveredCashFlow,
        AggregateKey::AssetValuations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateKey::PotentialGrossRevenue => "Potential Gross Revenue",
            AggregateKey::GrossPotentialRent => "Gross Potential Rent",
            AggregateKey::MiscIncome => "Miscellaneous Income",
            AggregateKey::TenantReimbursements => "Tenant Reimbursements",
            AggregateKey::VacancyLoss => "Vacancy Loss",
            AggregateKey::CreditLoss => "Credit Loss",
            AggregateKey::RentalAbatement => "Rental Abatement",
            AggregateKey::EffectiveGrossIncome => "Effective Gross Income",
            AggregateKey::TotalOperatingExpenses => "Total Operating Expenses",
            AggregateKey::OperatingExpenses => "Operating Expenses",
            AggregateKey::CapitalExpenditures => "Capital Expenditures",
            AggregateKey::TenantImprovements => "Tenant Improvements",
            AggregateKey::LeasingCommissions => "Leasing Commissions",
            AggregateKey::NetOperatingIncome => "Net Operating Income",
            AggregateKey::TotalCapitalUses => "Total Capital Uses",
            AggregateKey::TotalCapitalSources => "Total Capital Sources",
            AggregateKey::DispositionProceeds => "Disposition Proceeds",
            AggregateKey::UnleveredCashFlow => "Unlevered Cash Flow",
            AggregateKey::DebtDraws => "Debt Draws",
            AggregateKey::DebtService => "Debt Service",
            AggregateKey::InterestPayments => "Interest Payments",
            AggregateKey::PrincipalPayments => "Principal Payments",
            AggregateKey::EquityContributions => "Equity Contributions",
            AggregateKey::LeveredCashFlow => "Levered Cash Flow",
            AggregateKey::AssetValuations => "Asset Valuations",
        }
    }

    /// Keys this aggregate is composed from (one level).
    pub fn components(&self) -> &'static [AggregateKey] {
        use AggregateKey::*;
        match self {
            PotentialGrossRevenue => &[GrossPotentialRent, MiscIncome],
            EffectiveGrossIncome => &[
                PotentialGrossRevenue,
                VacancyLoss,
                CreditLoss,
                RentalAbatement,
                TenantReimbursements,
            ],
            NetOperatingIncome => &[EffectiveGrossIncome, TotalOperatingExpenses],
            UnleveredCashFlow => &[NetOperatingIncome, TotalCapitalUses, DispositionProceeds],
            DebtService => &[InterestPayments, PrincipalPayments],
            LeveredCashFlow => &[UnleveredCashFlow, DebtDraws, DebtService],
            _ => &[],
        }
    }

    /// `self` plus every key reachable through [`components`](Self::components).
    pub fn closure(&self) -> Vec<AggregateKey> {
        let mut out = vec![*self];
        let mut i = 0;
        while i < out.len() {
            for component in out[i].components() {
                if !out.contains(component) {
                    out.push(*component);
                }
            }
            i += 1;
        }
        out
    }
}

impl core::fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateKey {
    type Err = AggregateLookupError;

    /// Accepts the display label or a common abbreviation, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        if let Some(key) = AggregateKey::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
        {
            return Ok(*key);
        }
        let key = match wanted.to_ascii_lowercase().as_str() {
            "pgr" => AggregateKey::PotentialGrossRevenue,
            "gpr" => AggregateKey::GrossPotentialRent,
            "misc income" => AggregateKey::MiscIncome,
            "recoveries" | "expense reimbursements" => AggregateKey::TenantReimbursements,
            "abatement" => AggregateKey::RentalAbatement,
            "egi" => AggregateKey::EffectiveGrossIncome,
            "opex" => AggregateKey::OperatingExpenses,
            "capex" => AggregateKey::CapitalExpenditures,
            "ti" => AggregateKey::TenantImprovements,
            "lc" => AggregateKey::LeasingCommissions,
            "noi" => AggregateKey::NetOperatingIncome,
            "ucf" | "project cash flow" => AggregateKey::UnleveredCashFlow,
            "loan proceeds" => AggregateKey::DebtDraws,
            "lcf" => AggregateKey::LeveredCashFlow,
            _ => return Err(AggregateLookupError::UnknownKey(wanted.to_string())),
        };
        Ok(key)
    }
}

impl TryFrom<String> for AggregateKey {
    type Error = AggregateLookupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AggregateKey> for String {
    fn from(value: AggregateKey) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_unique_and_parse_back() {
        for key in AggregateKey::ALL {
            assert_eq!(key.as_str().parse::<AggregateKey>().unwrap(), key);
        }
        let mut labels: Vec<_> = AggregateKey::ALL.iter().map(|k| k.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), AggregateKey::ALL.len());
    }

    #[test]
    fn abbreviations_parse() {
        assert_eq!("EGI".parse::<AggregateKey>().unwrap(), AggregateKey::EffectiveGrossIncome);
        assert_eq!("noi".parse::<AggregateKey>().unwrap(), AggregateKey::NetOperatingIncome);
        assert_eq!(
            "total operating expenses".parse::<AggregateKey>().unwrap(),
            AggregateKey::TotalOperatingExpenses
        );
    }

    #[test]
    fn unknown_key_fails_fast() {
        assert_eq!(
            "Gross Margin".parse::<AggregateKey>().unwrap_err(),
            AggregateLookupError::UnknownKey("Gross Margin".to_string())
        );
    }

    #[test]
    fn closure_expands_nested_components() {
        let closure = AggregateKey::NetOperatingIncome.closure();
        assert_eq!(closure[0], AggregateKey::NetOperatingIncome);
        for expected in [
            AggregateKey::EffectiveGrossIncome,
            AggregateKey::TotalOperatingExpenses,
            AggregateKey::PotentialGrossRevenue,
            AggregateKey::GrossPotentialRent,
            AggregateKey::VacancyLoss,
        ] {
            assert!(closure.contains(&expected), "missing {expected}");
        }
        assert_eq!(AggregateKey::AssetValuations.closure(), vec![AggregateKey::AssetValuations]);
    }

    #[test]
    fn serializes_as_label() {
        let json = serde_json::to_string(&AggregateKey::DebtService).unwrap();
        assert_eq!(json, "\"Debt Service\"");
        assert!(serde_json::from_str::<AggregateKey>("\"Nope\"").is_err());
    }
}
