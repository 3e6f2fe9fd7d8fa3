//! Flat-file outputs: CSV tables and JSON summaries
//!
//! Column headers follow the established report layout so downstream
//! notebooks keep working; `serie_temporal_mensal_arima_<slug>.csv` in
//! particular is read back by the comparison, GLM and stationarity stages.

use crate::aggregate::{MonthlyValue, PentadValue};
use crate::calendar::YearMonth;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// A row of the monthly series consumed by the modelling stages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyCsvRow {
    pub periodo: String,
    pub precip_mm: f64,
}

/// A month of a series read back from disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyPoint {
    pub period: YearMonth,
    pub precip_mm: f64,
}

#[derive(Debug, Serialize)]
struct MonthlySummaryRow {
    periodo: String,
    precip_total: f64,
    n_dias: usize,
    media_diaria: f64,
    std_diaria: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PentadSummaryRow {
    pentada: u8,
    precip_total: f64,
    media_diaria: f64,
    std_diaria: Option<f64>,
    n_dias: usize,
}

/// File name of a station's monthly series
pub fn monthly_series_file_name(slug: &str) -> String {
    format!("serie_temporal_mensal_arima_{}.csv", slug.to_lowercase().replace(' ', "_"))
}

/// Path of a station's monthly series under the output root
pub fn monthly_series_path(output_dir: &Path, slug: &str) -> PathBuf {
    output_dir.join(slug).join(monthly_series_file_name(slug))
}

/// Serialize `rows` as a headed CSV file
pub fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a pretty-printed JSON document
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Export `periodo,precip_mm` for a station and return the written path
pub fn write_monthly_series(dir: &Path, slug: &str, series: &[MonthlyValue]) -> Result<PathBuf> {
    let path = dir.join(monthly_series_file_name(slug));
    write_rows(
        &path,
        series.iter().map(|m| MonthlyCsvRow {
            periodo: m.period.to_string(),
            precip_mm: m.total_mm,
        }),
    )?;
    Ok(path)
}

/// Export the full monthly aggregation
pub fn write_monthly_summary(path: &Path, series: &[MonthlyValue]) -> Result<()> {
    write_rows(
        path,
        series.iter().map(|m| MonthlySummaryRow {
            periodo: m.period.to_string(),
            precip_total: m.total_mm,
            n_dias: m.n_days,
            media_diaria: m.daily_mean,
            std_diaria: m.daily_std,
        }),
    )
}

/// Export the pentad climatology
pub fn write_pentad_summary(path: &Path, pentads: &[PentadValue]) -> Result<()> {
    write_rows(
        path,
        pentads.iter().map(|p| PentadSummaryRow {
            pentada: p.pentad,
            precip_total: p.total_mm,
            media_diaria: p.daily_mean,
            std_diaria: p.daily_std,
            n_dias: p.n_days,
        }),
    )
}

/// Read a monthly series written by [`write_monthly_series`], sorted by period
pub fn read_monthly_series(path: &Path) -> Result<Vec<MonthlyPoint>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut points = Vec::new();
    for row in reader.deserialize::<MonthlyCsvRow>() {
        let row = row?;
        points.push(MonthlyPoint {
            period: row.periodo.parse()?,
            precip_mm: row.precip_mm,
        });
    }
    points.sort_by_key(|p| p.period);
    Ok(points)
}
