//! Entry point for the HidroAnalise application.
//! Handles CLI parsing, configuration and logging setup, and dispatches the
//! pipeline stages.

use clap::Parser;
use hidroanalise::cli::{Args, Command};
use hidroanalise::clean::{run_clean, CleanOptions};
use hidroanalise::config::Config;
use hidroanalise::errors::Result;
use hidroanalise::inventory::{inspect, print_inventory};
use hidroanalise::logging::init_logging;
use hidroanalise::parallel::{get_parallel_info, ParallelConfig};
use hidroanalise::report::{comparison, glm, run_all, station, stationarity};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    println!(
        r#"
------------------------------------------------------------------
     _   _ _     _            _              _ _
    | | | (_) __| |_ __ ___  / \   _ __   __ _| (_)___  ___
    | |_| | |/ _` | '__/ _ \/ _ \ | '_ \ / _` | | / __|/ _ \
    |  _  | | (_| | | | (_) / ___ \| | | | (_| | | \__ \  __/
    |_| |_|_|\__,_|_|  \___/_/   \_\_| |_|\__,_|_|_|___/\___|
              Rainfall analysis for HIDROWEB stations
------------------------------------------------------------------
"#
    );

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "aborted");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        stations = config.stations.len(),
        "configuration loaded"
    );

    let parallel = ParallelConfig::new(args.threads);
    parallel.setup_global_pool()?;
    if args.verbose > 0 && parallel.is_parallel() {
        get_parallel_info().print_info();
    }

    match args.command {
        Command::Process => station::process(&config, &parallel)?.print(),
        Command::Compare => comparison::compare(&config)?.print(),
        Command::Glm => glm::glm(&config)?.print(),
        Command::Stationarity => stationarity::stationarity(&config)?.print(),
        Command::Inspect => print_inventory(&inspect(&config)?),
        Command::All => run_all(&config, &parallel)?,
        Command::Clean { mode, yes, dry_run } => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let report = run_clean(
                &config.output_dir,
                &config,
                mode.into(),
                CleanOptions {
                    assume_yes: yes,
                    dry_run,
                },
                &mut stdin.lock(),
                &mut stdout.lock(),
            )?;
            if !report.cancelled && !dry_run {
                println!("Removed {} file(s), {} failure(s)", report.removed, report.failed);
            }
        }
    }
    Ok(())
}
