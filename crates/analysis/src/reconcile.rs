//! Consistency checks between published totals and the committed records.
//!
//! Two kinds of identity are checked. Conservation groups every record by its
//! `flow_purpose` in one pass and compares each group with the published total for
//! that purpose, so a record tagged Operating that no operating aggregate picks up
//! is reported. Breakdown identities compare totals against their components.

use std::collections::BTreeMap;

use propflow_core::{FlowPurpose, Series};

use crate::error::ReconciliationError;
use crate::queries::LedgerQueries;

/// Check every total against its components, period by period.
///
/// Returns the first identity that is off by more than `tolerance`.
pub fn reconcile(queries: &LedgerQueries, tolerance: f64) -> Result<(), ReconciliationError> {
    let groups = by_flow_purpose(queries);
    let group = |purpose: FlowPurpose| groups.get(&purpose).cloned().unwrap_or_default();

    check(
        "Net Operating Income",
        &group(FlowPurpose::Operating),
        &queries.net_operating_income(),
        tolerance,
    )?;
    check(
        "Total Capital Uses",
        &-&group(FlowPurpose::CapitalUse),
        &queries.total_capital_uses(),
        tolerance,
    )?;
    check(
        "Total Capital Sources",
        &group(FlowPurpose::CapitalSource),
        &queries.total_capital_sources(),
        tolerance,
    )?;

    check(
        "Capital Uses Breakdown",
        &queries.capital_uses_breakdown().total(),
        &queries.total_capital_uses(),
        tolerance,
    )?;
    check(
        "Capital Sources Breakdown",
        &queries.capital_sources_breakdown().total(),
        &queries.total_capital_sources(),
        tolerance,
    )?;

    let egi = queries
        .potential_gross_revenue()
        .plus(&queries.vacancy_loss())
        .plus(&queries.credit_loss())
        .plus(&queries.rental_abatement())
        .plus(&queries.tenant_reimbursements());
    check(
        "Effective Gross Income",
        &egi,
        &queries.effective_gross_income(),
        tolerance,
    )?;

    tracing::debug!(tolerance, "ledger aggregates reconciled");
    Ok(())
}

/// Signed per-period amounts of every record, grouped by flow purpose.
fn by_flow_purpose(queries: &LedgerQueries) -> BTreeMap<FlowPurpose, Series> {
    let mut groups: BTreeMap<FlowPurpose, Series> = BTreeMap::new();
    for record in queries.snapshot().iter() {
        groups
            .entry(record.flow_purpose)
            .or_default()
            .accumulate(record.period(), record.amount);
    }
    groups
}

fn check(
    identity: &'static str,
    expected: &Series,
    actual: &Series,
    tolerance: f64,
) -> Result<(), ReconciliationError> {
    let periods = expected.periods().chain(actual.periods());
    for period in periods {
        let (e, a) = (expected.get(period), actual.get(period));
        if (e - a).abs() > tolerance {
            return Err(ReconciliationError {
                identity,
                period,
                expected: e,
                actual: a,
            });
        }
    }
    Ok(())
}
