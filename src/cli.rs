//! Command-line interface definitions using `clap`.

use crate::clean::CleanMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rainfall analysis pipeline for HIDROWEB station records
#[derive(Parser, Debug)]
#[command(
    name = "hidroanalise",
    version,
    about = "Rainfall analysis for HIDROWEB daily station records"
)]
pub struct Args {
    /// TOML configuration file (defaults to ./hidroanalise.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory with the station `.txt` files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Root directory for charts and tables
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads for station processing. Sequential when omitted.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Per-station charts and monthly series
    Process,
    /// Cross-station comparison from the exported monthly series
    Compare,
    /// Gamma and Gaussian GLMs on the monthly series
    Glm,
    /// ADF test and ACF/PACF diagnostics
    Stationarity,
    /// List the station files and their coverage without writing anything
    Inspect,
    /// process, compare, glm and stationarity in sequence
    All,
    /// Delete generated files, keeping the directory tree
    Clean {
        /// Which files to delete
        #[arg(value_enum, default_value_t = CleanArg::Charts)]
        mode: CleanArg,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Only list what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanArg {
    /// Chart images (.svg, .png)
    Charts,
    /// Tables (.csv, .json)
    Tables,
    /// Both
    All,
}

impl From<CleanArg> for CleanMode {
    fn from(arg: CleanArg) -> Self {
        match arg {
            CleanArg::Charts => CleanMode::Charts,
            CleanArg::Tables => CleanMode::Tables,
            CleanArg::All => CleanMode::All,
        }
    }
}
