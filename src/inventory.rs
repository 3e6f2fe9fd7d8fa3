//! Station file inventory (`inspect`)
//!
//! Parses every station file and reports its coverage without writing
//! anything, so problems in the raw data show up before a full run.

use crate::aggregate::{missing_months, monthly_series};
use crate::config::Config;
use crate::errors::Result;
use crate::ingest::{discover_station_files, load_station_file, station_from_path, StationSeries};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Coverage of one station file
#[derive(Debug, Clone)]
pub struct StationInventory {
    pub name: String,
    pub slug: String,
    pub file: PathBuf,
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub skipped_lines: usize,
    pub duplicate_days: usize,
    /// Observed days over calendar days between first and last date
    pub completeness: f64,
    pub months: usize,
    pub missing_months: usize,
}

impl StationInventory {
    pub fn from_series(series: &StationSeries) -> Self {
        let monthly = monthly_series(&series.records);
        let (first_date, last_date) = (series.first_date(), series.last_date());
        let completeness = match (first_date, last_date) {
            (Some(first), Some(last)) => {
                let span = (last - first).num_days() + 1;
                series.records.len() as f64 / span as f64
            }
            _ => 0.0,
        };
        Self {
            name: series.station.name.clone(),
            slug: series.station.slug.clone(),
            file: series.station.source.clone(),
            records: series.records.len(),
            first_date,
            last_date,
            skipped_lines: series.skipped_lines,
            duplicate_days: series.duplicate_days,
            completeness,
            months: monthly.len(),
            missing_months: missing_months(&monthly).len(),
        }
    }
}

/// Outcome of an inventory pass; unreadable files are listed with their error
#[derive(Debug, Default)]
pub struct Inventory {
    pub stations: Vec<StationInventory>,
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Inspect every station file in the configured data directory
pub fn inspect(config: &Config) -> Result<Inventory> {
    let mut inventory = Inventory::default();
    for path in discover_station_files(&config.data_dir)? {
        let station = station_from_path(&path, config);
        match load_station_file(&path, station) {
            Ok(series) => inventory.stations.push(StationInventory::from_series(&series)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable station file");
                inventory.unreadable.push((path, e.to_string()));
            }
        }
    }
    Ok(inventory)
}

fn date_or_dash(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Print the inventory as a table
pub fn print_inventory(inventory: &Inventory) {
    println!("\n Station files");
    println!("=================");

    if inventory.stations.is_empty() && inventory.unreadable.is_empty() {
        println!("   (No station files found)");
        return;
    }

    for s in &inventory.stations {
        println!("    {} [{}]", s.name, s.slug);
        println!("      file: {}", s.file.display());
        println!(
            "      records: {} ({} to {}), completeness {:.1}%",
            s.records,
            date_or_dash(s.first_date),
            date_or_dash(s.last_date),
            s.completeness * 100.0
        );
        println!(
            "      months: {} observed, {} missing",
            s.months, s.missing_months
        );
        if s.skipped_lines > 0 || s.duplicate_days > 0 {
            println!(
                "      skipped lines: {}, duplicate days: {}",
                s.skipped_lines, s.duplicate_days
            );
        }
    }

    if !inventory.unreadable.is_empty() {
        println!("\n Unreadable files");
        println!("====================");
        for (path, error) in &inventory.unreadable {
            println!("    {}: {}", path.display(), error);
        }
    }
}
