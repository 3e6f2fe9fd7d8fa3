//! Removal of generated artifacts
//!
//! Only files directly inside the known output directories are touched,
//! and only by extension. Directories themselves are never removed, so a
//! cleaned tree can be repopulated by the next run.

use crate::config::Config;
use crate::errors::{HidroError, Result};
use crate::report::{COMPARISON_DIR, GLM_DIR, STATIONARITY_DIR};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Which generated files to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanMode {
    /// Chart images; `.png` covers trees produced by older runs
    #[default]
    Charts,
    Tables,
    All,
}

impl CleanMode {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Charts => &["svg", "png"],
            Self::Tables => &["csv", "json"],
            Self::All => &["svg", "png", "csv", "json"],
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Charts => "charts (.svg, .png)",
            Self::Tables => "tables (.csv, .json)",
            Self::All => "charts and tables",
        }
    }

    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions()
                    .iter()
                    .any(|wanted| ext.eq_ignore_ascii_case(wanted))
            })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanOptions {
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// List matching files without deleting them
    pub dry_run: bool,
}

/// Outcome of a cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub matched: Vec<PathBuf>,
    pub removed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Directories cleanup is allowed to touch, in a stable order
pub fn target_dirs(output_dir: &Path, config: &Config) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = config
        .stations
        .iter()
        .map(|s| output_dir.join(&s.slug))
        .collect();
    dirs.push(output_dir.join(COMPARISON_DIR));
    dirs.push(output_dir.join(GLM_DIR));
    dirs.extend(config.stations.iter().map(|s| output_dir.join(GLM_DIR).join(&s.slug)));
    dirs.push(output_dir.join(STATIONARITY_DIR));
    dirs
}

/// Files under the target directories that match `mode`
///
/// # Errors
///
/// [`HidroError::OutputDirMissing`] when `output_dir` does not exist.
pub fn find_targets(output_dir: &Path, config: &Config, mode: CleanMode) -> Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Err(HidroError::OutputDirMissing {
            path: output_dir.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for dir in target_dirs(output_dir, config) {
        if !dir.is_dir() {
            continue;
        }
        let mut found: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && mode.matches(path))
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Ask a yes/no question. Accepts `s`, `sim`, `y` and `yes`.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<bool> {
    write!(output, "{prompt} (s/n): ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "s" | "sim" | "y" | "yes"))
}

/// Delete generated files, prompting on `input`/`output` unless
/// `options.assume_yes`
pub fn run_clean(
    output_dir: &Path,
    config: &Config,
    mode: CleanMode,
    options: CleanOptions,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<CleanReport> {
    let matched = find_targets(output_dir, config, mode)?;
    let mut report = CleanReport {
        matched,
        ..CleanReport::default()
    };

    if report.matched.is_empty() {
        writeln!(output, "No {} found under {}", mode.describe(), output_dir.display())?;
        return Ok(report);
    }

    writeln!(output, "{} file(s) match {}:", report.matched.len(), mode.describe())?;
    for path in &report.matched {
        writeln!(output, "   {}", path.display())?;
    }

    if options.dry_run {
        return Ok(report);
    }

    if !options.assume_yes
        && !confirm(input, output, &format!("Delete {} file(s)?", report.matched.len()))?
    {
        writeln!(output, "Cancelled.")?;
        report.cancelled = true;
        return Ok(report);
    }

    for path in &report.matched {
        match fs::remove_file(path) {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not delete file");
                report.failed += 1;
            }
        }
    }
    tracing::info!(removed = report.removed, failed = report.failed, "cleanup finished");
    Ok(report)
}
