//! Cross-station comparison (`compare`)

use super::{load_configured_series, StationMonthly, COMPARISON_DIR};
use crate::aggregate::monthly_climatology;
use crate::calendar::MONTH_LABELS;
use crate::charts::{self, rgb, Bar, BarChart, BoxGroup, LineChart, Series, XAxis};
use crate::config::Config;
use crate::errors::{HidroError, Result};
use crate::export::write_rows;
use crate::statistics::{index_trend, Summary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Fewer stations than this make a comparison meaningless
pub const MIN_STATIONS: usize = 2;

/// Row of `estatisticas_descritivas.csv`
#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveRow {
    #[serde(rename = "Estação")]
    pub station: String,
    #[serde(rename = "Média")]
    pub mean: f64,
    #[serde(rename = "Mediana")]
    pub median: f64,
    #[serde(rename = "Desvio Padrão")]
    pub std: f64,
    #[serde(rename = "Mínimo")]
    pub min: f64,
    #[serde(rename = "Máximo")]
    pub max: f64,
    #[serde(rename = "Q1")]
    pub q1: f64,
    #[serde(rename = "Q3")]
    pub q3: f64,
}

impl DescriptiveRow {
    fn new(station: &str, s: &Summary) -> Self {
        Self {
            station: station.to_string(),
            mean: s.mean,
            median: s.median,
            std: s.std,
            min: s.min,
            max: s.max,
            q1: s.q1,
            q3: s.q3,
        }
    }
}

/// Row of `coeficiente_variacao.csv`
#[derive(Debug, Clone, Serialize)]
pub struct VariationRow {
    #[serde(rename = "Estação")]
    pub station: String,
    #[serde(rename = "CV (%)")]
    pub cv_percent: f64,
}

#[derive(Debug, Default)]
pub struct ComparisonSummary {
    pub stations: Vec<DescriptiveRow>,
    pub variation: Vec<VariationRow>,
    pub outputs: Vec<PathBuf>,
}

impl ComparisonSummary {
    pub fn print(&self) {
        println!("Comparison of {} stations:", self.stations.len());
        for (row, cv) in self.stations.iter().zip(&self.variation) {
            println!(
                "   {:<24} mean {:>7.2} mm | median {:>7.2} mm | CV {:>5.1}%",
                row.station, row.mean, row.median, cv.cv_percent
            );
        }
        println!("   {} files written", self.outputs.len());
    }
}

/// Compare the monthly series of every configured station
///
/// # Errors
///
/// [`HidroError::InsufficientData`] when fewer than [`MIN_STATIONS`] series
/// could be loaded.
pub fn compare(config: &Config) -> Result<ComparisonSummary> {
    let stations = load_configured_series(config, &config.output_dir);
    for s in &stations {
        tracing::info!(station = %s.name, months = s.points.len(), "loaded monthly series");
    }
    if stations.len() < MIN_STATIONS {
        return Err(HidroError::insufficient(
            "station comparison",
            MIN_STATIONS,
            stations.len(),
        ));
    }
    if stations.len() < config.stations.len() {
        tracing::warn!(
            loaded = stations.len(),
            configured = config.stations.len(),
            "comparing a subset of the configured stations"
        );
    }
    compare_series(&stations, &config.output_dir.join(COMPARISON_DIR))
}

/// Write the comparison charts and tables for already-loaded series
pub fn compare_series(stations: &[StationMonthly], dir: &Path) -> Result<ComparisonSummary> {
    fs::create_dir_all(dir)?;

    let summaries = stations
        .iter()
        .map(|s| Summary::from_values(&s.totals()))
        .collect::<Result<Vec<_>>>()?;

    let mut summary = ComparisonSummary {
        stations: stations
            .iter()
            .zip(&summaries)
            .map(|(s, stats)| DescriptiveRow::new(&s.name, stats))
            .collect(),
        variation: stations
            .iter()
            .zip(&summaries)
            .map(|(s, stats)| VariationRow {
                station: s.name.clone(),
                cv_percent: stats.coefficient_of_variation(),
            })
            .collect(),
        outputs: Vec::new(),
    };

    summary.outputs.push(series_chart(stations, dir)?);
    summary.outputs.push(mean_chart(stations, &summaries, dir)?);
    summary.outputs.push(boxplot_chart(stations, dir)?);
    summary.outputs.push(climatology_chart(stations, dir)?);
    summary.outputs.push(trend_chart(stations, dir)?);
    summary.outputs.push(variation_chart(stations, &summary.variation, dir)?);

    let stats_path = dir.join("estatisticas_descritivas.csv");
    write_rows(&stats_path, &summary.stations)?;
    summary.outputs.push(stats_path);
    let cv_path = dir.join("coeficiente_variacao.csv");
    write_rows(&cv_path, &summary.variation)?;
    summary.outputs.push(cv_path);

    Ok(summary)
}

fn decimal_points(s: &StationMonthly) -> Vec<(f64, f64)> {
    s.points
        .iter()
        .map(|p| (p.period.decimal_year(), p.precip_mm))
        .collect()
}

fn year_range(stations: &[StationMonthly]) -> String {
    let first = stations.iter().filter_map(|s| s.points.first()).map(|p| p.period.year).min();
    let last = stations.iter().filter_map(|s| s.points.last()).map(|p| p.period.year).max();
    match (first, last) {
        (Some(a), Some(b)) => format!(" ({a}-{b})"),
        _ => String::new(),
    }
}

fn series_chart(stations: &[StationMonthly], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("01_series_temporais_comparacao.svg");
    let series = stations
        .iter()
        .map(|s| Series::line(s.name.clone(), decimal_points(s), rgb(s.color)).with_markers())
        .collect();
    let root = charts::svg_figure(&path, (1400, 700))?;
    charts::line_chart(
        &root,
        &LineChart {
            title: &format!("Comparação de Séries Temporais Mensais de Precipitação{}", year_range(stations)),
            x_desc: "Data",
            y_desc: "Precipitação (mm)",
            series,
            ref_lines: Vec::new(),
            x_axis: XAxis::Numeric(0),
        },
    )?;
    root.present()?;
    // The backend borrows `path` until dropped
    drop(root);
    Ok(path)
}

fn mean_chart(stations: &[StationMonthly], summaries: &[Summary], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("02_media_precipitacao_comparacao.svg");
    let bars = stations
        .iter()
        .zip(summaries)
        .map(|(s, stats)| Bar {
            label: s.name.clone(),
            value: stats.mean,
            error: None,
            color: rgb(s.color),
        })
        .collect();
    let root = charts::svg_figure(&path, (1000, 600))?;
    charts::bar_chart(
        &root,
        &BarChart {
            title: "Precipitação Mensal Média - Comparação entre Estações",
            x_desc: "",
            y_desc: "Precipitação Média Mensal (mm)",
            bars,
            decimals: 1,
            suffix: "",
        },
    )?;
    root.present()?;
    drop(root);
    Ok(path)
}

fn boxplot_chart(stations: &[StationMonthly], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("03_boxplot_comparacao.svg");
    let groups: Vec<BoxGroup> = stations
        .iter()
        .map(|s| BoxGroup {
            label: s.name.clone(),
            values: s.totals(),
            color: rgb(s.color),
        })
        .collect();
    let root = charts::svg_figure(&path, (1000, 600))?;
    charts::box_chart(
        &root,
        "Distribuição de Precipitação Mensal - Boxplot Comparativo",
        "",
        "Precipitação (mm)",
        &groups,
    )?;
    root.present()?;
    drop(root);
    Ok(path)
}

fn climatology_chart(stations: &[StationMonthly], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("04_climatologia_mensal_comparacao.svg");
    let series = stations
        .iter()
        .map(|s| {
            let points = monthly_climatology(s.points.iter().map(|p| (p.period, p.precip_mm)))
                .iter()
                .filter(|c| c.count > 0)
                .map(|c| (f64::from(c.month - 1), c.mean))
                .collect();
            Series::line(s.name.clone(), points, rgb(s.color)).with_markers()
        })
        .collect();
    let root = charts::svg_figure(&path, (1300, 600))?;
    charts::line_chart(
        &root,
        &LineChart {
            title: "Climatologia Mensal - Padrão Sazonal Comparativo",
            x_desc: "Mês do Ano",
            y_desc: "Precipitação Média Mensal (mm)",
            series,
            ref_lines: Vec::new(),
            x_axis: XAxis::Categories(MONTH_LABELS.iter().map(ToString::to_string).collect()),
        },
    )?;
    root.present()?;
    drop(root);
    Ok(path)
}

fn trend_chart(stations: &[StationMonthly], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("05_tendencia_linear_comparacao.svg");
    let mut series = Vec::new();
    for s in stations {
        let color = rgb(s.color);
        let points = decimal_points(s);
        series.push(Series::line("", points.clone(), charts::faded(color)).with_width(1));
        match index_trend(&s.totals()) {
            Ok(fit) => {
                let line = points
                    .iter()
                    .enumerate()
                    .map(|(i, &(x, _))| (x, fit.predict(i as f64)))
                    .collect();
                series.push(
                    Series::line(format!("{} (R²={:.3})", s.name, fit.r_squared()), line, color)
                        .with_width(3),
                );
            }
            Err(e) => tracing::warn!(station = %s.name, error = %e, "no trend line"),
        }
    }
    let root = charts::svg_figure(&path, (1400, 700))?;
    charts::line_chart(
        &root,
        &LineChart {
            title: "Análise de Tendência Linear - Comparação entre Estações",
            x_desc: "Data",
            y_desc: "Precipitação (mm)",
            series,
            ref_lines: Vec::new(),
            x_axis: XAxis::Numeric(0),
        },
    )?;
    root.present()?;
    drop(root);
    Ok(path)
}

fn variation_chart(stations: &[StationMonthly], rows: &[VariationRow], dir: &Path) -> Result<PathBuf> {
    let path = dir.join("06_coeficiente_variacao_comparacao.svg");
    let bars = stations
        .iter()
        .zip(rows)
        .map(|(s, row)| Bar {
            label: s.name.clone(),
            value: row.cv_percent,
            error: None,
            color: rgb(s.color),
        })
        .collect();
    let root = charts::svg_figure(&path, (1000, 600))?;
    charts::bar_chart(
        &root,
        &BarChart {
            title: "Coeficiente de Variação (maior CV = maior variabilidade)",
            x_desc: "",
            y_desc: "Coeficiente de Variação (%)",
            bars,
            decimals: 1,
            suffix: "%",
        },
    )?;
    root.present()?;
    drop(root);
    Ok(path)
}
