//! Period-indexed values.

use std::collections::BTreeMap;
use std::ops::{Add, Neg};

use serde::{Deserialize, Serialize};

use crate::period::{Period, Timeline};

/// A monthly time series: one value per period, ordered by period.
///
/// Absent periods read as zero through [`Series::get`]. Values outside a timeline are
/// kept when zero-filling, so no amount ever disappears from a total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series(BTreeMap<Period, f64>);

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// The same value in every period of `timeline`.
    pub fn constant(timeline: &Timeline, value: f64) -> Self {
        timeline.periods().map(|p| (p, value)).collect()
    }

    /// All-zero series over `timeline`.
    pub fn zeros(timeline: &Timeline) -> Self {
        Self::constant(timeline, 0.0)
    }

    /// Value at `period`, zero if absent.
    pub fn get(&self, period: Period) -> f64 {
        self.0.get(&period).copied().unwrap_or(0.0)
    }

    /// Value at `period`, `None` if absent.
    pub fn value(&self, period: Period) -> Option<f64> {
        self.0.get(&period).copied()
    }

    /// Set the value at `period`, replacing any previous value.
    pub fn insert(&mut self, period: Period, value: f64) {
        self.0.insert(period, value);
    }

    /// Add `amount` to the value at `period`.
    pub fn accumulate(&mut self, period: Period, amount: f64) {
        *self.0.entry(period).or_insert(0.0) += amount;
    }

    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_period(&self) -> Option<Period> {
        self.0.keys().next().copied()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.0.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Period, f64)> + '_ {
        self.0.iter().map(|(p, v)| (*p, *v))
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.0.keys().copied()
    }

    /// Pointwise sum over the union of both indexes.
    pub fn plus(&self, other: &Series) -> Series {
        let mut out = self.clone();
        for (period, value) in other.iter() {
            out.accumulate(period, value);
        }
        out
    }

    pub fn scale(&self, factor: f64) -> Series {
        self.map(|v| v * factor)
    }

    pub fn abs(&self) -> Series {
        self.map(f64::abs)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Series {
        self.0.iter().map(|(p, v)| (*p, f(*v))).collect()
    }

    /// Ensure every period of `timeline` is present (absent ones become zero).
    pub fn zero_filled(mut self, timeline: &Timeline) -> Series {
        for period in timeline.periods() {
            self.0.entry(period).or_insert(0.0);
        }
        self
    }

    /// Largest absolute pointwise difference over the union of both indexes.
    pub fn max_abs_diff(&self, other: &Series) -> f64 {
        self.periods()
            .chain(other.periods())
            .map(|p| (self.get(p) - other.get(p)).abs())
            .fold(0.0, f64::max)
    }

    /// Pointwise equality within `tolerance`, treating absent periods as zero.
    pub fn approx_eq(&self, other: &Series, tolerance: f64) -> bool {
        self.max_abs_diff(other) <= tolerance
    }
}

impl FromIterator<(Period, f64)> for Series {
    /// Collects pairs, summing values that share a period.
    fn from_iter<I: IntoIterator<Item = (Period, f64)>>(iter: I) -> Self {
        let mut out = Series::new();
        for (period, value) in iter {
            out.accumulate(period, value);
        }
        out
    }
}

impl Add for &Series {
    type Output = Series;

    fn add(self, rhs: &Series) -> Series {
        self.plus(rhs)
    }
}

impl Neg for &Series {
    type Output = Series;

    fn neg(self) -> Series {
        self.map(|v| -v)
    }
}

/// A period-indexed table: one [`Series`] per column (typically a subcategory).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakdownTable(BTreeMap<String, Series>);

impl BreakdownTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, column: impl Into<String>, period: Period, amount: f64) {
        self.0
            .entry(column.into())
            .or_default()
            .accumulate(period, amount);
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.0.get(name)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Series)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Row totals: the pointwise sum of every column.
    pub fn total(&self) -> Series {
        self.0
            .values()
            .flat_map(|s| s.iter())
            .collect()
    }

    /// Apply `f` to every value of every column.
    pub fn map(&self, f: impl Fn(f64) -> f64 + Copy) -> BreakdownTable {
        BreakdownTable(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.map(f)))
                .collect(),
        )
    }

    pub fn zero_filled(self, timeline: &Timeline) -> BreakdownTable {
        BreakdownTable(
            self.0
                .into_iter()
                .map(|(k, v)| (k, v.zero_filled(timeline)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(m: u32) -> Period {
        Period::new(2024, m).unwrap()
    }

    #[test]
    fn absent_periods_read_as_zero() {
        let s: Series = [(p(1), 10.0)].into_iter().collect();
        assert_eq!(s.get(p(1)), 10.0);
        assert_eq!(s.get(p(2)), 0.0);
        assert_eq!(s.value(p(2)), None);
    }

    #[test]
    fn collecting_sums_duplicate_periods() {
        let s: Series = [(p(1), 10.0), (p(1), -4.0), (p(2), 1.0)].into_iter().collect();
        assert_eq!(s.get(p(1)), 6.0);
        assert_eq!(s.len(), 2);
        assert_eq!(s.sum(), 7.0);
    }

    #[test]
    fn plus_covers_union_of_indexes() {
        let a: Series = [(p(1), 1.0), (p(2), 2.0)].into_iter().collect();
        let b: Series = [(p(2), 3.0), (p(3), 4.0)].into_iter().collect();
        let c = &a + &b;
        assert_eq!(c.get(p(1)), 1.0);
        assert_eq!(c.get(p(2)), 5.0);
        assert_eq!(c.get(p(3)), 4.0);
        assert_eq!((-&c).sum(), -10.0);
    }

    #[test]
    fn zero_fill_keeps_values_outside_timeline() {
        let s: Series = [(Period::new(2023, 12).unwrap(), 5.0)].into_iter().collect();
        let filled = s.zero_filled(&Timeline::new(p(1), 3));
        assert_eq!(filled.len(), 4);
        assert_eq!(filled.sum(), 5.0);
    }

    #[test]
    fn breakdown_total_equals_column_sum() {
        let mut table = BreakdownTable::new();
        table.accumulate("Purchase Price", p(1), 1_000_000.0);
        table.accumulate("Closing Costs", p(1), 20_000.0);
        table.accumulate("Hard Costs", p(2), 50_000.0);
        let total = table.total();
        assert_eq!(total.get(p(1)), 1_020_000.0);
        assert_eq!(total.get(p(2)), 50_000.0);
        assert_eq!(table.len(), 3);
        let column_sum: f64 = table.columns().map(|(_, s)| s.sum()).sum();
        assert!((column_sum - total.sum()).abs() < 1e-9);
    }

    #[test]
    fn approx_eq_treats_missing_as_zero() {
        let a: Series = [(p(1), 1.0), (p(2), 0.0)].into_iter().collect();
        let b: Series = [(p(1), 1.004)].into_iter().collect();
        assert!(a.approx_eq(&b, 0.01));
        assert!(!a.approx_eq(&b, 0.001));
    }
}
