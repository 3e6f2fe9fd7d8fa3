//! Station file ingestion
//!
//! Station files are HIDROWEB text exports: a free-form preamble followed by
//! a table whose header line starts with `Data`. Each table row carries a
//! `dd/mm/YYYY` date and the day's precipitation in millimetres, written
//! with a comma or a dot as decimal separator. Files are latin1 encoded.

use crate::calendar::{pentad_of_day, YearMonth};
use crate::config::Config;
use crate::errors::{HidroError, Result};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Date format of the first table column
const DATE_FORMAT: &str = "%d/%m/%Y";

/// HIDROWEB station codes for the region start with this prefix; the file
/// stem before it is the station name.
const STATION_CODE_PREFIX: &str = "33";

/// One observed day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub precip_mm: f64,
}

impl DailyRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn period(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    pub fn pentad(&self) -> u8 {
        pentad_of_day(self.date.day())
    }
}

/// Identity of a station, derived from its file name and the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Lower-case directory slug, e.g. `campoalegre`
    pub slug: String,
    /// Display name, e.g. `Campo Alegre de Goiás`
    pub name: String,
    /// Source file
    pub source: PathBuf,
}

/// Parsed daily series of one station
#[derive(Debug, Clone)]
pub struct StationSeries {
    pub station: Station,
    /// Sorted by date, at most one record per day
    pub records: Vec<DailyRecord>,
    /// Table lines that could not be parsed
    pub skipped_lines: usize,
    /// Repeated dates dropped in favour of their first occurrence
    pub duplicate_days: usize,
}

impl StationSeries {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Inclusive year span of the records
    pub fn year_span(&self) -> Option<(i32, i32)> {
        Some((self.first_date()?.year(), self.last_date()?.year()))
    }

    pub fn total_precip(&self) -> f64 {
        self.records.iter().map(|r| r.precip_mm).sum()
    }
}

/// All `*.txt` files in `dir`, sorted by file name
pub fn discover_station_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Derive the station identity from a file name such as
/// `campoalegre33567890.txt`.
pub fn station_from_path(path: &Path, config: &Config) -> Station {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let raw = stem
        .split(STATION_CODE_PREFIX)
        .next()
        .unwrap_or_default()
        .trim()
        .replace('_', " ");
    let derived = title_case(&raw);
    let slug = derived.to_lowercase().replace(' ', "_");
    let name = config.display_name(&slug, &derived);

    Station {
        slug,
        name,
        source: path.to_path_buf(),
    }
}

/// Read and parse one station file
pub fn load_station_file(path: &Path, station: Station) -> Result<StationSeries> {
    let bytes = fs::read(path)?;
    let text = decode_latin1(&bytes);
    let mut series = parse_station_text(&text, station).map_err(|e| match e {
        HidroError::MissingHeader { .. } => HidroError::MissingHeader {
            path: path.to_path_buf(),
        },
        HidroError::NoRecords { .. } => HidroError::NoRecords {
            path: path.to_path_buf(),
        },
        other => other,
    })?;
    series.station.source = path.to_path_buf();

    tracing::debug!(
        station = %series.station.name,
        records = series.records.len(),
        skipped = series.skipped_lines,
        duplicates = series.duplicate_days,
        "parsed station file"
    );
    Ok(series)
}

/// Parse the decoded contents of a station file
pub fn parse_station_text(text: &str, station: Station) -> Result<StationSeries> {
    let mut lines = text.lines();
    if !lines.by_ref().any(|line| line.trim().starts_with("Data")) {
        return Err(HidroError::MissingHeader {
            path: station.source.clone(),
        });
    }

    let mut records = Vec::new();
    let mut skipped_lines = 0;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_row(line) {
            Some(record) => records.push(record),
            None => {
                tracing::trace!(line, "skipping unparsable row");
                skipped_lines += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(HidroError::NoRecords {
            path: station.source.clone(),
        });
    }

    // Stable sort keeps file order among equal dates, so dedup keeps the first.
    records.sort_by_key(|r| r.date);
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    records.retain(|r| seen.insert(r.date));
    let duplicate_days = before - records.len();
    if duplicate_days > 0 {
        tracing::warn!(
            station = %station.name,
            duplicate_days,
            "station file repeats dates; keeping first occurrence"
        );
    }

    Ok(StationSeries {
        station,
        records,
        skipped_lines,
        duplicate_days,
    })
}

/// Parse `dd/mm/YYYY <precip> ...`; extra columns are ignored
fn parse_row(line: &str) -> Option<DailyRecord> {
    let mut fields = line.split_whitespace();
    let date = NaiveDate::parse_from_str(fields.next()?, DATE_FORMAT).ok()?;
    let precip_mm = parse_decimal(fields.next()?)?;
    Some(DailyRecord { date, precip_mm })
}

/// Parse a number written with either `,` or `.` as decimal separator
pub fn parse_decimal(field: &str) -> Option<f64> {
    let value: f64 = field.replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// ISO-8859-1 maps every byte to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
