//! Roll-ups of daily records into calendar buckets
//!
//! Every aggregation here is keyed by calendar boundaries only: the month
//! (`YearMonth`), the pentad within the month, the year, and the month of
//! the year. Each daily record lands in exactly one bucket of every kind,
//! so all totals reconcile with the daily sum (see [`reconcile`]).

use crate::calendar::{YearMonth, PENTADS_PER_MONTH};
use crate::errors::{HidroError, Result};
use crate::ingest::DailyRecord;
use crate::statistics::{StatOperation, StatisticalReduction};
use serde::Serialize;
use std::collections::BTreeMap;

/// Absolute tolerance, in millimetres, when reconciling totals
const RECONCILE_TOLERANCE_MM: f64 = 1e-6;

/// One month of the monthly series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyValue {
    pub period: YearMonth,
    pub total_mm: f64,
    pub n_days: usize,
    pub daily_mean: f64,
    /// `None` when the month has a single observation
    pub daily_std: Option<f64>,
}

/// Statistics of one pentad across the whole record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PentadValue {
    pub pentad: u8,
    pub total_mm: f64,
    pub daily_mean: f64,
    pub daily_std: Option<f64>,
    pub n_days: usize,
}

/// Mean and spread of one calendar month across the record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthClimatology {
    pub month: u32,
    pub mean: f64,
    pub std: Option<f64>,
    pub count: usize,
}

/// Group values by key, keeping keys ordered
fn bucket<K: Ord, I>(items: I) -> BTreeMap<K, Vec<f64>>
where
    I: IntoIterator<Item = (K, f64)>,
{
    let mut buckets: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (key, value) in items {
        buckets.entry(key).or_default().push(value);
    }
    buckets
}

/// Monthly totals with per-month daily statistics, ascending, observed
/// months only
pub fn monthly_series(records: &[DailyRecord]) -> Vec<MonthlyValue> {
    bucket(records.iter().map(|r| (r.period(), r.precip_mm)))
        .into_iter()
        .map(|(period, values)| MonthlyValue {
            period,
            total_mm: values.reduce(StatOperation::Sum).unwrap_or(0.0),
            n_days: values.len(),
            daily_mean: values.reduce(StatOperation::Mean).unwrap_or(f64::NAN),
            daily_std: values.reduce(StatOperation::Std),
        })
        .collect()
}

/// Months between the first and last observed month that have no record
pub fn missing_months(series: &[MonthlyValue]) -> Vec<YearMonth> {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return Vec::new();
    };
    let mut observed = series.iter().map(|m| m.period).peekable();
    let mut missing = Vec::new();
    let mut current = first.period;
    while current <= last.period {
        if observed.peek() == Some(&current) {
            observed.next();
        } else {
            missing.push(current);
        }
        current = current.succ();
    }
    missing
}

/// Pentad statistics pooled over every month of the record, pentads 1..=6
pub fn pentad_climatology(records: &[DailyRecord]) -> Vec<PentadValue> {
    let buckets = bucket(records.iter().map(|r| (r.pentad(), r.precip_mm)));
    (1..=PENTADS_PER_MONTH)
        .map(|pentad| {
            let values = buckets.get(&pentad).map(Vec::as_slice).unwrap_or(&[]);
            PentadValue {
                pentad,
                total_mm: values.reduce(StatOperation::Sum).unwrap_or(0.0),
                daily_mean: values.reduce(StatOperation::Mean).unwrap_or(f64::NAN),
                daily_std: values.reduce(StatOperation::Std),
                n_days: values.len(),
            }
        })
        .collect()
}

/// Pentad totals per year, keyed by `(year, pentad)`
pub fn pentad_by_year(records: &[DailyRecord]) -> BTreeMap<(i32, u8), f64> {
    bucket(records.iter().map(|r| ((r.year(), r.pentad()), r.precip_mm)))
        .into_iter()
        .map(|(key, values)| (key, values.iter().sum()))
        .collect()
}

/// Annual totals, ascending by year
pub fn annual_totals(records: &[DailyRecord]) -> Vec<(i32, f64)> {
    bucket(records.iter().map(|r| (r.year(), r.precip_mm)))
        .into_iter()
        .map(|(year, values)| (year, values.iter().sum()))
        .collect()
}

/// Daily values grouped by calendar month (index 0 is January)
pub fn daily_by_calendar_month(records: &[DailyRecord]) -> [Vec<f64>; 12] {
    let mut months: [Vec<f64>; 12] = Default::default();
    for record in records {
        months[(record.month() - 1) as usize].push(record.precip_mm);
    }
    months
}

/// Mean and standard deviation of daily precipitation per calendar month
pub fn monthly_climatology_daily(records: &[DailyRecord]) -> Vec<MonthClimatology> {
    climatology(daily_by_calendar_month(records))
}

/// Mean and standard deviation of monthly totals per calendar month
///
/// Takes `(period, total)` pairs so that both [`MonthlyValue`] series and
/// reloaded monthly CSVs can feed it.
pub fn monthly_climatology<I>(totals: I) -> Vec<MonthClimatology>
where
    I: IntoIterator<Item = (YearMonth, f64)>,
{
    let mut months: [Vec<f64>; 12] = Default::default();
    for (period, total) in totals {
        months[(period.month - 1) as usize].push(total);
    }
    climatology(months)
}

fn climatology(months: [Vec<f64>; 12]) -> Vec<MonthClimatology> {
    months
        .into_iter()
        .zip(1u32..)
        .map(|(values, month)| MonthClimatology {
            month,
            mean: values.reduce(StatOperation::Mean).unwrap_or(f64::NAN),
            std: values.reduce(StatOperation::Std),
            count: values.len(),
        })
        .collect()
}

/// Every aggregation derived from one station's daily records
#[derive(Debug, Clone)]
pub struct StationAggregates {
    pub monthly: Vec<MonthlyValue>,
    pub pentads: Vec<PentadValue>,
    pub pentad_by_year: BTreeMap<(i32, u8), f64>,
    pub annual: Vec<(i32, f64)>,
    pub climatology_daily: Vec<MonthClimatology>,
    pub missing_months: Vec<YearMonth>,
}

impl StationAggregates {
    /// Compute all aggregations and check that their totals reconcile
    pub fn from_records(records: &[DailyRecord]) -> Result<Self> {
        let monthly = monthly_series(records);
        let aggregates = Self {
            missing_months: missing_months(&monthly),
            pentads: pentad_climatology(records),
            pentad_by_year: pentad_by_year(records),
            annual: annual_totals(records),
            climatology_daily: monthly_climatology_daily(records),
            monthly,
        };
        reconcile(records, &aggregates)?;
        Ok(aggregates)
    }

    pub fn monthly_totals(&self) -> Vec<f64> {
        self.monthly.iter().map(|m| m.total_mm).collect()
    }
}

/// Verify that monthly, pentad, per-year pentad and annual totals all equal
/// the daily sum
pub fn reconcile(records: &[DailyRecord], aggregates: &StationAggregates) -> Result<()> {
    let expected: f64 = records.iter().map(|r| r.precip_mm).sum();
    let checks = [
        ("monthly series", aggregates.monthly.iter().map(|m| m.total_mm).sum::<f64>()),
        ("pentads", aggregates.pentads.iter().map(|p| p.total_mm).sum::<f64>()),
        ("pentads by year", aggregates.pentad_by_year.values().sum::<f64>()),
        ("annual totals", aggregates.annual.iter().map(|(_, t)| t).sum::<f64>()),
    ];
    let tolerance = RECONCILE_TOLERANCE_MM * expected.abs().max(1.0);
    for (what, actual) in checks {
        if (actual - expected).abs() > tolerance {
            return Err(HidroError::Reconciliation {
                what: what.to_string(),
                expected,
                actual,
            });
        }
    }
    let days: usize = aggregates.monthly.iter().map(|m| m.n_days).sum();
    if days != records.len() {
        return Err(HidroError::Reconciliation {
            what: "monthly day counts".to_string(),
            expected: records.len() as f64,
            actual: days as f64,
        });
    }
    Ok(())
}
