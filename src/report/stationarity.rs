//! Stationarity diagnostics for ARIMA order selection (`stationarity`)
//!
//! The ADF test decides the differencing order: `d = 0` when the unit root
//! is rejected at the configured significance, `d = 1` otherwise. The
//! correlograms are drawn next to the station's other charts for choosing
//! `p` and `q` by eye.

use super::{load_configured_series, StationMonthly, STATIONARITY_DIR};
use crate::charts::{self, STEEL_BLUE};
use crate::config::Config;
use crate::errors::Result;
use crate::export::write_rows;
use crate::statistics::timeseries::confidence_band;
use crate::statistics::{acf, adf_test, pacf_yule_walker, AdfResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Row of `adf_resultados.csv`
#[derive(Debug, Clone, Serialize)]
pub struct AdfRow {
    #[serde(rename = "Estação")]
    pub station: String,
    #[serde(rename = "Meses")]
    pub months: usize,
    #[serde(rename = "Estatística ADF")]
    pub statistic: f64,
    #[serde(rename = "p-valor")]
    pub p_value: f64,
    #[serde(rename = "Lags")]
    pub used_lag: usize,
    #[serde(rename = "Crítico 1%")]
    pub critical_1: f64,
    #[serde(rename = "Crítico 5%")]
    pub critical_5: f64,
    #[serde(rename = "Crítico 10%")]
    pub critical_10: f64,
    #[serde(rename = "Estacionária")]
    pub stationary: bool,
    #[serde(rename = "d")]
    pub differencing: u8,
    #[serde(rename = "Modelo sugerido")]
    pub suggestion: String,
}

/// Differencing order implied by an ADF result
pub fn suggested_differencing(result: &AdfResult, significance: f64) -> u8 {
    if result.is_stationary(significance) {
        0
    } else {
        1
    }
}

/// `ARIMA(1,d,1)` starting point
pub fn suggested_order(d: u8) -> String {
    format!("ARIMA(1,{d},1)")
}

#[derive(Debug, Default)]
pub struct StationaritySummary {
    pub rows: Vec<AdfRow>,
    pub outputs: Vec<PathBuf>,
}

impl StationaritySummary {
    pub fn print(&self) {
        println!("Stationarity (ADF):");
        for row in &self.rows {
            println!(
                "   {:<24} ADF {:>8.3} | p {:>6.4} | {} | {}",
                row.station,
                row.statistic,
                row.p_value,
                if row.stationary { "stationary" } else { "unit root" },
                row.suggestion
            );
        }
    }
}

/// Run the ADF test and correlograms for every configured station
pub fn stationarity(config: &Config) -> Result<StationaritySummary> {
    let stations = load_configured_series(config, &config.output_dir);
    let mut summary = StationaritySummary::default();
    if stations.is_empty() {
        tracing::warn!("no monthly series available; nothing to test");
        return Ok(summary);
    }

    for station in &stations {
        match analyze_station(station, config) {
            Ok((row, chart)) => {
                tracing::info!(
                    station = %station.name,
                    statistic = row.statistic,
                    p_value = row.p_value,
                    d = row.differencing,
                    "ADF test"
                );
                summary.rows.push(row);
                summary.outputs.push(chart);
            }
            Err(e) => tracing::warn!(station = %station.name, error = %e, "stationarity skipped"),
        }
    }

    let dir = config.output_dir.join(STATIONARITY_DIR);
    fs::create_dir_all(&dir)?;
    let path = dir.join("adf_resultados.csv");
    write_rows(&path, &summary.rows)?;
    summary.outputs.push(path);
    Ok(summary)
}

fn analyze_station(station: &StationMonthly, config: &Config) -> Result<(AdfRow, PathBuf)> {
    let totals = station.totals();
    let result = adf_test(&totals)?;
    let d = suggested_differencing(&result, config.stationarity.significance);

    let chart = config.output_dir.join(&station.slug).join("acf_pacf.svg");
    correlograms(&totals, config.stationarity.correlogram_lags, &chart)?;

    let row = AdfRow {
        station: station.name.clone(),
        months: totals.len(),
        statistic: result.statistic,
        p_value: result.p_value,
        used_lag: result.used_lag,
        critical_1: result.critical_values.one_percent,
        critical_5: result.critical_values.five_percent,
        critical_10: result.critical_values.ten_percent,
        stationary: d == 0,
        differencing: d,
        suggestion: suggested_order(d),
    };
    Ok((row, chart))
}

fn correlograms(values: &[f64], lags: usize, path: &Path) -> Result<()> {
    let band = confidence_band(values.len());
    let acf_values = acf(values, lags)?;
    let pacf_values = pacf_yule_walker(values, lags)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let root = charts::svg_figure(path, (1200, 800))?;
    let panels = root.split_evenly((2, 1));
    charts::correlogram(
        &panels[0],
        "Autocorrelação (ACF) - Série Mensal",
        "ACF",
        &acf_values,
        band,
        STEEL_BLUE,
    )?;
    charts::correlogram(
        &panels[1],
        "Autocorrelação Parcial (PACF) - Série Mensal",
        "PACF",
        &pacf_values,
        band,
        STEEL_BLUE,
    )?;
    root.present()?;
    Ok(())
}
