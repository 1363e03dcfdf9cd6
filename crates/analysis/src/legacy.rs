//! Name matching for entries that predate the dedicated TI/LC subcategories.
//!
//! Only applied to capital-use records tagged `CapEx` or a free-form subcategory,
//! which is how older entries booked TI and LC lines. Records with any other known
//! subcategory are classified by that alone.

use propflow_core::{FlowPurpose, Subcategory, TransactionRecord};

/// Case-sensitive: "TI" must not match "Utilities".
pub const TENANT_IMPROVEMENT_PATTERNS: [&str; 2] = ["TI", "Tenant Improvement"];
pub const LEASING_COMMISSION_PATTERNS: [&str; 2] = ["LC", "Leasing Commission"];

fn name_matches(record: &TransactionRecord, patterns: &[&str]) -> bool {
    record.flow_purpose == FlowPurpose::CapitalUse
        && (record.subcategory.is_generic() || record.subcategory == Subcategory::CapEx)
        && patterns.iter().any(|p| record.item_name.contains(p))
}

pub fn is_tenant_improvement(record: &TransactionRecord) -> bool {
    record.subcategory == Subcategory::TenantImprovements
        || name_matches(record, &TENANT_IMPROVEMENT_PATTERNS)
}

/// Records already claimed as tenant improvements are never leasing commissions.
pub fn is_leasing_commission(record: &TransactionRecord) -> bool {
    !is_tenant_improvement(record)
        && (record.subcategory == Subcategory::LeasingCommissions
            || name_matches(record, &LEASING_COMMISSION_PATTERNS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use propflow_core::{AssetId, CashFlowCategory, SeriesMetadata, SourceId};

    fn record(subcategory: &str, name: &str, amount: f64) -> TransactionRecord {
        SeriesMetadata::new(
            CashFlowCategory::Capital,
            subcategory,
            name,
            SourceId::new(),
            AssetId::new(),
        )
        .record(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), amount)
        .unwrap()
    }

    #[test]
    fn dedicated_subcategories_match_without_names() {
        assert!(is_tenant_improvement(&record("Tenant Improvements", "Suite 200 buildout", -10.0)));
        assert!(is_leasing_commission(&record("Leasing Commissions", "Broker fee", -5.0)));
    }

    #[test]
    fn generic_entries_fall_back_to_name_patterns() {
        assert!(is_tenant_improvement(&record("Fit-out", "TI allowance", -10.0)));
        assert!(is_tenant_improvement(&record("Fit-out", "Tenant Improvement Y2", -10.0)));
        assert!(is_leasing_commission(&record("Fees", "LC - renewal", -5.0)));
        assert!(!is_tenant_improvement(&record("Fees", "Utilities", -5.0)));
        assert!(!is_tenant_improvement(&record("Fees", "ti allowance", -5.0)));
    }

    #[test]
    fn capex_entries_fall_back_to_name_patterns() {
        let allowance = SeriesMetadata::new(
            CashFlowCategory::Expense,
            "CapEx",
            "TI Allowance",
            SourceId::new(),
            AssetId::new(),
        )
        .record(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), -10.0)
        .unwrap();
        assert_eq!(allowance.flow_purpose, FlowPurpose::CapitalUse);
        assert!(is_tenant_improvement(&allowance));
        assert!(!is_leasing_commission(&allowance));
        assert!(is_leasing_commission(&record("CapEx", "LC - new lease", -5.0)));
        assert!(!is_tenant_improvement(&record("CapEx", "Roof replacement", -5.0)));
    }

    #[test]
    fn known_subcategories_never_use_names() {
        assert!(!is_tenant_improvement(&record("Hard Costs", "TI shell work", -10.0)));
    }

    #[test]
    fn sources_are_never_matched() {
        assert!(!is_tenant_improvement(&record("Reimbursement", "TI reimbursement", 10.0)));
    }
}
