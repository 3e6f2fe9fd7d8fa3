//! HidroAnalise: rainfall analysis for HIDROWEB daily station records
//!
//! A batch pipeline that turns daily rain gauge files into monthly and
//! pentad (5-day) aggregations, descriptive statistics, climatology, trend
//! lines, GLM predictions and stationarity diagnostics, written out as SVG
//! charts and CSV/JSON tables.
//!
//! ## Module Organization
//!
//! - [`ingest`]: station file discovery and parsing
//! - [`calendar`]: months, pentads and their labels
//! - [`aggregate`]: monthly, pentad, annual and climatological roll-ups
//! - [`statistics`]: summaries, regression, GLMs, ADF and correlograms
//! - [`charts`]: SVG chart primitives
//! - [`export`]: CSV and JSON writers
//! - [`report`]: the `process`, `compare`, `glm` and `stationarity` stages
//! - [`inventory`]: read-only listing of the station files
//! - [`clean`]: removal of generated artifacts
//! - [`config`], [`logging`], [`parallel`], [`errors`]: ambient setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hidroanalise::prelude::*;
//!
//! let config = Config::load(None).unwrap();
//! let summary = hidroanalise::report::station::process(&config, &ParallelConfig::default()).unwrap();
//! summary.print();
//! ```

pub mod aggregate;
pub mod calendar;
pub mod charts;
pub mod clean;
pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod ingest;
pub mod inventory;
pub mod logging;
pub mod parallel;
pub mod report;
pub mod statistics;

pub use errors::{HidroError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::aggregate::{MonthlyValue, PentadValue, StationAggregates};
    pub use crate::calendar::YearMonth;
    pub use crate::config::Config;
    pub use crate::errors::{HidroError, Result};
    pub use crate::ingest::{DailyRecord, Station, StationSeries};
    pub use crate::parallel::ParallelConfig;
    pub use crate::statistics::{Family, StatOperation, StatisticalReduction, Summary};
}
