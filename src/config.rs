//! Run configuration
//!
//! Loading is layered:
//! 1. Built-in defaults (the four reference stations)
//! 2. An optional TOML file (`--config`, or `hidroanalise.toml` in the
//!    working directory when present)
//! 3. Command-line overrides applied by the caller
//!
//! ```toml
//! data_dir = "data"
//! output_dir = "output/graficos"
//!
//! [[stations]]
//! slug = "goianesia"
//! name = "Goianésia"
//! color = "#1f77b4"
//!
//! [glm]
//! seed = 42
//! test_fraction = 0.2
//! ```

use crate::errors::{HidroError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "hidroanalise.toml";

/// Colours handed out to stations that are not in the registry
const FALLBACK_PALETTE: [&str; 6] = [
    "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the station `.txt` files
    pub data_dir: PathBuf,

    /// Root of the generated chart/table tree
    pub output_dir: PathBuf,

    /// Known stations, in comparison order
    pub stations: Vec<StationConfig>,

    /// GLM comparison settings
    pub glm: GlmConfig,

    /// Stationarity diagnostics settings
    pub stationarity: StationarityConfig,
}

/// One entry of the station registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    /// Directory/file slug derived from the station file name, e.g. `campoalegre`
    pub slug: String,

    /// Display name used in chart titles and tables
    pub name: String,

    /// Hex colour (`#rrggbb`) used in cross-station charts
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlmConfig {
    /// Seed of the train/test shuffle
    pub seed: u64,

    /// Fraction of rows held out for testing
    pub test_fraction: f64,

    /// Stations with fewer usable rows are skipped
    pub min_rows: usize,

    /// IRLS iteration cap
    pub max_iterations: usize,

    /// Relative deviance change that counts as converged
    pub tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StationarityConfig {
    /// Lags shown on the ACF/PACF chart
    pub correlogram_lags: usize,

    /// ADF p-value below which the series is treated as stationary
    pub significance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output/graficos"),
            stations: default_stations(),
            glm: GlmConfig::default(),
            stationarity: StationarityConfig::default(),
        }
    }
}

impl Default for GlmConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            min_rows: 20,
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

impl Default for StationarityConfig {
    fn default() -> Self {
        Self {
            correlogram_lags: 24,
            significance: 0.05,
        }
    }
}

fn default_stations() -> Vec<StationConfig> {
    [
        ("goianesia", "Goianésia", "#1f77b4"),
        ("campoalegre", "Campo Alegre de Goiás", "#ff7f0e"),
        ("marzagao", "Marzagão", "#2ca02c"),
        ("tresranchos", "Três Ranchos", "#d62728"),
    ]
    .into_iter()
    .map(|(slug, name, color)| StationConfig {
        slug: slug.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

impl Config {
    /// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, falling back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            }
        };

        let config = match candidate {
            Some(file) => {
                tracing::debug!(path = %file.display(), "loading configuration file");
                let text = fs::read_to_string(&file)?;
                Self::from_toml_str(&text).map_err(|e| match e {
                    HidroError::Config { source, .. } => HidroError::Config { path: file, source },
                    other => other,
                })?
            }
            None => Self::default(),
        };

        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|source| HidroError::Config {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.glm.test_fraction) || self.glm.test_fraction == 0.0 {
            return Err(HidroError::InvalidConfig(format!(
                "glm.test_fraction must be in (0, 1), got {}",
                self.glm.test_fraction
            )));
        }
        if self.glm.max_iterations == 0 {
            return Err(HidroError::InvalidConfig(
                "glm.max_iterations must be positive".to_string(),
            ));
        }
        for station in &self.stations {
            parse_hex_color(&station.color).ok_or_else(|| {
                HidroError::InvalidConfig(format!(
                    "station '{}' has invalid colour '{}'",
                    station.slug, station.color
                ))
            })?;
        }
        Ok(())
    }

    /// Registry entry for a slug
    pub fn station(&self, slug: &str) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.slug == slug)
    }

    /// Display name for a slug, falling back to `derived` for unknown stations
    pub fn display_name(&self, slug: &str, derived: &str) -> String {
        self.station(slug)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| derived.to_string())
    }

    /// Chart colour for a slug; unknown stations get a stable palette entry
    pub fn color_for(&self, slug: &str) -> (u8, u8, u8) {
        if let Some(rgb) = self.station(slug).and_then(|s| parse_hex_color(&s.color)) {
            return rgb;
        }
        let index = slug.bytes().map(usize::from).sum::<usize>() % FALLBACK_PALETTE.len();
        parse_hex_color(FALLBACK_PALETTE[index]).unwrap_or((0, 0, 0))
    }
}

/// Parse `#rrggbb` into an RGB triple
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
