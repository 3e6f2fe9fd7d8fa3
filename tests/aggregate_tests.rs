//! Tests for calendar helpers and the aggregation layer

use chrono::{Duration, NaiveDate};
use hidroanalise::{
    aggregate::{
        annual_totals, missing_months, monthly_climatology, monthly_series, pentad_by_year,
        pentad_climatology, reconcile, StationAggregates,
    },
    calendar::{pentad_label, pentad_of_day, YearMonth},
    errors::HidroError,
    ingest::DailyRecord,
};
use proptest::prelude::*;

fn record(y: i32, m: u32, d: u32, precip_mm: f64) -> DailyRecord {
    DailyRecord {
        date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        precip_mm,
    }
}

#[test]
fn test_pentad_of_day_boundaries() {
    assert_eq!(pentad_of_day(1), 1);
    assert_eq!(pentad_of_day(5), 1);
    assert_eq!(pentad_of_day(6), 2);
    assert_eq!(pentad_of_day(25), 5);
    assert_eq!(pentad_of_day(26), 6);
    assert_eq!(pentad_of_day(30), 6);
    assert_eq!(pentad_of_day(31), 6);
    assert_eq!(pentad_label(1), "P1 (dias 1-5)");
    assert_eq!(pentad_label(6), "P6 (dias 26-31)");
}

#[test]
fn test_year_month_parsing_and_order() {
    let ym: YearMonth = "1999-12".parse().unwrap();
    assert_eq!(ym, YearMonth::new(1999, 12).unwrap());
    assert_eq!(ym.to_string(), "1999-12");
    assert_eq!(ym.succ(), YearMonth::new(2000, 1).unwrap());
    assert!(ym < ym.succ());
    assert_eq!(YearMonth::new(2000, 2).unwrap().days_in_month(), 29);
    assert_eq!(YearMonth::new(1900, 2).unwrap().days_in_month(), 28);

    for bad in ["1999-13", "1999", "abcd-01", "1999-00"] {
        let err = bad.parse::<YearMonth>().unwrap_err();
        assert!(matches!(err, HidroError::InvalidPeriod { .. }), "{bad}");
    }
}

#[test]
fn test_monthly_series_statistics() {
    let records = vec![
        record(2000, 1, 1, 10.0),
        record(2000, 1, 2, 20.0),
        record(2000, 1, 3, 30.0),
        record(2000, 3, 15, 5.0),
    ];
    let monthly = monthly_series(&records);

    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].period.to_string(), "2000-01");
    assert!((monthly[0].total_mm - 60.0).abs() < 1e-12);
    assert_eq!(monthly[0].n_days, 3);
    assert!((monthly[0].daily_mean - 20.0).abs() < 1e-12);
    assert!((monthly[0].daily_std.unwrap() - 10.0).abs() < 1e-12);
    // A single observation has no sample standard deviation
    assert_eq!(monthly[1].daily_std, None);

    // February is not filled in
    let missing = missing_months(&monthly);
    assert_eq!(missing, vec![YearMonth::new(2000, 2).unwrap()]);
}

#[test]
fn test_pentad_climatology_always_has_six_pentads() {
    let records = vec![record(2001, 1, 31, 4.0), record(2001, 2, 1, 1.0)];
    let pentads = pentad_climatology(&records);

    assert_eq!(pentads.len(), 6);
    assert_eq!(pentads[0].total_mm, 1.0);
    assert_eq!(pentads[5].total_mm, 4.0);
    for empty in &pentads[1..5] {
        assert_eq!(empty.n_days, 0);
        assert_eq!(empty.total_mm, 0.0);
        assert!(empty.daily_mean.is_nan());
    }
}

#[test]
fn test_annual_and_pentad_by_year() {
    let records = vec![
        record(2000, 6, 1, 2.0),
        record(2000, 6, 7, 3.0),
        record(2001, 6, 2, 4.0),
    ];
    assert_eq!(annual_totals(&records), vec![(2000, 5.0), (2001, 4.0)]);

    let by_year = pentad_by_year(&records);
    assert_eq!(by_year.get(&(2000, 1)), Some(&2.0));
    assert_eq!(by_year.get(&(2000, 2)), Some(&3.0));
    assert_eq!(by_year.get(&(2001, 1)), Some(&4.0));
    assert_eq!(by_year.len(), 3);
}

#[test]
fn test_monthly_climatology_of_totals() {
    let records = vec![
        record(2000, 1, 1, 100.0),
        record(2001, 1, 1, 200.0),
        record(2000, 7, 1, 0.0),
    ];
    let monthly = monthly_series(&records);
    let climatology = monthly_climatology(monthly.iter().map(|v| (v.period, v.total_mm)));

    assert_eq!(climatology.len(), 12);
    assert!((climatology[0].mean - 150.0).abs() < 1e-12);
    assert_eq!(climatology[0].count, 2);
    assert_eq!(climatology[6].mean, 0.0);
    assert_eq!(climatology[6].std, None);
    assert_eq!(climatology[1].count, 0);
    assert!(climatology[1].mean.is_nan());
}

#[test]
fn test_monthly_value_serializes_period_as_text() {
    let records = vec![record(2000, 1, 1, 10.0), record(2000, 1, 2, 20.0)];
    let monthly = monthly_series(&records);

    let json = serde_json::to_value(monthly[0]).unwrap();
    assert_eq!(json["period"], "2000-01");
    assert_eq!(json["total_mm"], 30.0);
    assert_eq!(json["n_days"], 2);

    let period = YearMonth::new(1987, 11).unwrap();
    assert_eq!(serde_json::to_string(&period).unwrap(), "\"1987-11\"");
}

#[test]
fn test_reconcile_detects_tampering() {
    let records = vec![record(2000, 1, 1, 1.0), record(2000, 2, 1, 2.0)];
    let mut aggregates = StationAggregates::from_records(&records).unwrap();
    assert!(reconcile(&records, &aggregates).is_ok());

    aggregates.monthly[0].total_mm += 1.0;
    let err = reconcile(&records, &aggregates).unwrap_err();
    assert!(matches!(err, HidroError::Reconciliation { .. }));
}

/// Daily records on distinct consecutive-ish days starting at `start`
fn records_strategy() -> impl Strategy<Value = Vec<DailyRecord>> {
    (
        1950i32..2030,
        1u32..=12,
        prop::collection::vec((1i64..4, 0.0f64..250.0), 1..400),
    )
        .prop_map(|(year, month, steps)| {
            let mut date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            steps
                .into_iter()
                .map(|(step, precip_mm)| {
                    date += Duration::days(step);
                    DailyRecord { date, precip_mm }
                })
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_totals_reconcile(records in records_strategy()) {
        let daily: f64 = records.iter().map(|r| r.precip_mm).sum();
        let aggregates = StationAggregates::from_records(&records).unwrap();
        let tolerance = 1e-6 * daily.max(1.0);

        let monthly: f64 = aggregates.monthly.iter().map(|m| m.total_mm).sum();
        let pentads: f64 = aggregates.pentads.iter().map(|p| p.total_mm).sum();
        let annual: f64 = aggregates.annual.iter().map(|(_, t)| t).sum();
        prop_assert!((monthly - daily).abs() <= tolerance);
        prop_assert!((pentads - daily).abs() <= tolerance);
        prop_assert!((annual - daily).abs() <= tolerance);
    }

    #[test]
    fn prop_every_day_in_exactly_one_pentad(records in records_strategy()) {
        let pentads = pentad_climatology(&records);
        prop_assert_eq!(pentads.len(), 6);
        let counted: usize = pentads.iter().map(|p| p.n_days).sum();
        prop_assert_eq!(counted, records.len());

        for r in &records {
            let p = pentad_of_day(chrono::Datelike::day(&r.date));
            prop_assert!((1..=6).contains(&p));
        }
    }

    #[test]
    fn prop_monthly_series_is_ordered_and_complete(records in records_strategy()) {
        let monthly = monthly_series(&records);
        prop_assert!(monthly.windows(2).all(|w| w[0].period < w[1].period));
        let days: usize = monthly.iter().map(|m| m.n_days).sum();
        prop_assert_eq!(days, records.len());

        let span = monthly.len() + missing_months(&monthly).len();
        let (first, last) = (monthly[0].period, monthly[monthly.len() - 1].period);
        let expected = (last.year - first.year) * 12 + last.month as i32 - first.month as i32 + 1;
        prop_assert_eq!(span as i32, expected);
    }
}
