//! Pipeline stages
//!
//! - [`station`]: per-station charts and exports (`process`)
//! - [`comparison`]: cross-station comparison (`compare`)
//! - [`glm`]: Gamma and Gaussian GLMs (`glm`)
//! - [`stationarity`]: ADF and correlograms (`stationarity`)
//!
//! `process` is the only stage that reads the raw station files. The others
//! start from the monthly series it exports, so they can be rerun without
//! reparsing.

pub mod comparison;
pub mod glm;
pub mod station;
pub mod stationarity;

use crate::config::Config;
use crate::errors::Result;
use crate::export::{monthly_series_path, read_monthly_series, MonthlyPoint};
use std::path::Path;

pub const COMPARISON_DIR: &str = "Comparacao";
pub const GLM_DIR: &str = "GLM_Predicoes";
pub const STATIONARITY_DIR: &str = "Estacionariedade";

/// Monthly series of one configured station, read back from disk
#[derive(Debug, Clone)]
pub struct StationMonthly {
    pub slug: String,
    pub name: String,
    pub color: (u8, u8, u8),
    pub points: Vec<MonthlyPoint>,
}

impl StationMonthly {
    pub fn totals(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.precip_mm).collect()
    }
}

/// Load the exported monthly series of every configured station, in
/// registry order. Stations without a readable series are logged and left
/// out.
pub fn load_configured_series(config: &Config, output_dir: &Path) -> Vec<StationMonthly> {
    config
        .stations
        .iter()
        .filter_map(|station| {
            let path = monthly_series_path(output_dir, &station.slug);
            if !path.exists() {
                tracing::warn!(
                    station = %station.name,
                    path = %path.display(),
                    "monthly series not found; run `process` first"
                );
                return None;
            }
            match read_monthly_series(&path) {
                Ok(points) if points.is_empty() => {
                    tracing::warn!(station = %station.name, "monthly series is empty");
                    None
                }
                Ok(points) => Some(StationMonthly {
                    slug: station.slug.clone(),
                    name: station.name.clone(),
                    color: config.color_for(&station.slug),
                    points,
                }),
                Err(e) => {
                    tracing::error!(station = %station.name, error = %e, "could not read monthly series");
                    None
                }
            }
        })
        .collect()
}

/// Run `process`, `compare`, `glm` and `stationarity` in order. A failing
/// later stage is reported but does not undo earlier outputs.
pub fn run_all(config: &Config, parallel: &crate::parallel::ParallelConfig) -> Result<()> {
    let processed = station::process(config, parallel)?;
    processed.print();

    match comparison::compare(config) {
        Ok(summary) => summary.print(),
        Err(e) => tracing::error!(error = %e, "comparison stage failed"),
    }
    glm::glm(config)?.print();
    stationarity::stationarity(config)?.print();
    Ok(())
}
