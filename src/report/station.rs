//! Per-station analysis (`process`)
//!
//! Each station file becomes a directory named after the station slug with
//! nine charts, the monthly series used by the later stages, two summary
//! tables and a JSON run summary. A station that fails at any step is
//! logged and skipped; the others are unaffected.

use crate::aggregate::{daily_by_calendar_month, PentadValue, StationAggregates};
use crate::calendar::{pentad_label, MONTH_LABELS, PENTADS_PER_MONTH};
use crate::charts::{
    self, Bar, BarChart, BoxGroup, LineChart, Marker, RefLine, Series, XAxis, CORAL, LIGHT_BLUE,
    MEAN_GREEN, MEDIAN_GREEN, MONTH_RAMP, STEEL_BLUE, TREND_RED, VIRIDIS_6,
};
use crate::config::Config;
use crate::errors::Result;
use crate::export;
use crate::ingest::{discover_station_files, load_station_file, station_from_path, StationSeries};
use crate::parallel::ParallelConfig;
use crate::statistics::{index_trend, linregress, Histogram, LinearFit, Summary};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const DAILY_HISTOGRAM_BINS: usize = 35;
const ANNUAL_HISTOGRAM_BINS: usize = 15;

/// Trend line summary stored in the JSON report
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrendSummary {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub p_value: f64,
}

impl From<&LinearFit> for TrendSummary {
    fn from(fit: &LinearFit) -> Self {
        Self {
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared(),
            p_value: fit.p_value,
        }
    }
}

/// What `process` produced for one station
#[derive(Debug, Clone, Serialize)]
pub struct StationSummary {
    pub station: String,
    pub slug: String,
    pub source: PathBuf,
    pub records: usize,
    pub skipped_lines: usize,
    pub duplicate_days: usize,
    pub first_date: String,
    pub last_date: String,
    pub first_year: i32,
    pub last_year: i32,
    pub months: usize,
    pub missing_months: Vec<String>,
    pub total_precip_mm: f64,
    pub mean_monthly_mm: f64,
    /// Slope in mm per month
    pub monthly_trend: Option<TrendSummary>,
    /// Slope in mm per year
    pub annual_trend: Option<TrendSummary>,
    pub outputs: Vec<PathBuf>,
}

/// Result of a `process` run
#[derive(Debug, Default)]
pub struct ProcessSummary {
    pub stations: Vec<StationSummary>,
    pub failures: Vec<(PathBuf, String)>,
}

impl ProcessSummary {
    pub fn print(&self) {
        println!("{}", "=".repeat(70));
        for s in &self.stations {
            println!("Station: {}", s.station);
            println!("   File: {}", s.source.display());
            println!(
                "   Records: {} | Years: {}-{} | Months: {}",
                s.records, s.first_year, s.last_year, s.months
            );
            if s.skipped_lines > 0 || s.duplicate_days > 0 {
                println!(
                    "   Skipped lines: {} | Duplicate days: {}",
                    s.skipped_lines, s.duplicate_days
                );
            }
            if !s.missing_months.is_empty() {
                println!("   Missing months: {}", s.missing_months.len());
            }
            println!("   Outputs: {} files", s.outputs.len());
        }
        for (path, error) in &self.failures {
            println!("Failed: {} ({error})", path.display());
        }
        println!("{}", "=".repeat(70));
        println!(
            "Processed {} station(s), {} failure(s)",
            self.stations.len(),
            self.failures.len()
        );
    }
}

/// Process every station file in the data directory
///
/// # Errors
///
/// Only when the data directory itself cannot be read. Per-station errors
/// are collected in [`ProcessSummary::failures`].
pub fn process(config: &Config, parallel: &ParallelConfig) -> Result<ProcessSummary> {
    let files = discover_station_files(&config.data_dir)?;
    if files.is_empty() {
        tracing::warn!(dir = %config.data_dir.display(), "no .txt station files found");
        return Ok(ProcessSummary::default());
    }
    tracing::info!(stations = files.len(), "processing station files");

    let results = parallel.map(&files, |path| process_station_file(path, config));

    let mut summary = ProcessSummary::default();
    for (path, result) in files.into_iter().zip(results) {
        match result {
            Ok(station) => {
                tracing::info!(station = %station.station, outputs = station.outputs.len(), "station done");
                summary.stations.push(station);
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "station skipped");
                summary.failures.push((path, e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Parse, aggregate, chart and export one station file
pub fn process_station_file(path: &Path, config: &Config) -> Result<StationSummary> {
    let station = station_from_path(path, config);
    let series = load_station_file(path, station)?;
    let aggregates = StationAggregates::from_records(&series.records)?;
    if !aggregates.missing_months.is_empty() {
        tracing::warn!(
            station = %series.station.name,
            missing = aggregates.missing_months.len(),
            "monthly series has gaps; months are not filled"
        );
    }

    let dir = config.output_dir.join(&series.station.slug);
    fs::create_dir_all(&dir)?;
    let writer = StationCharts {
        dir: &dir,
        name: &series.station.name,
    };

    let monthly_totals = aggregates.monthly_totals();
    let monthly_trend = index_trend(&monthly_totals).ok();
    let annual_trend = annual_fit(&aggregates);

    let mut outputs = vec![
        writer.monthly_series(&aggregates, monthly_trend.as_ref())?,
        writer.pentad_analysis(&aggregates)?,
        writer.pentad_by_year(&aggregates)?,
        writer.annual(&aggregates, annual_trend.as_ref())?,
        writer.monthly_climatology(&aggregates)?,
        writer.daily_histogram(&series)?,
        writer.annual_histogram(&aggregates)?,
        writer.monthly_boxplot(&series)?,
        writer.annual_boxplot(&aggregates)?,
    ];

    let slug = &series.station.slug;
    outputs.push(export::write_monthly_series(&dir, slug, &aggregates.monthly)?);
    let monthly_summary = dir.join(format!("resumo_mensal_{slug}.csv"));
    export::write_monthly_summary(&monthly_summary, &aggregates.monthly)?;
    outputs.push(monthly_summary);
    let pentad_summary = dir.join(format!("resumo_pentadal_{slug}.csv"));
    export::write_pentad_summary(&pentad_summary, &aggregates.pentads)?;
    outputs.push(pentad_summary);

    let json_path = dir.join(format!("resumo_{slug}.json"));
    outputs.push(json_path.clone());
    let summary = summarize(&series, &aggregates, monthly_trend.as_ref(), annual_trend.as_ref(), outputs);
    export::write_json(&json_path, &summary)?;
    Ok(summary)
}

fn annual_fit(aggregates: &StationAggregates) -> Option<LinearFit> {
    let (years, totals): (Vec<f64>, Vec<f64>) =
        aggregates.annual.iter().map(|&(y, t)| (f64::from(y), t)).unzip();
    linregress(&years, &totals).ok()
}

fn summarize(
    series: &StationSeries,
    aggregates: &StationAggregates,
    monthly_trend: Option<&LinearFit>,
    annual_trend: Option<&LinearFit>,
    outputs: Vec<PathBuf>,
) -> StationSummary {
    let (first_year, last_year) = series.year_span().unwrap_or_default();
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    let months = aggregates.monthly.len();
    let total: f64 = aggregates.monthly.iter().map(|m| m.total_mm).sum();
    StationSummary {
        station: series.station.name.clone(),
        slug: series.station.slug.clone(),
        source: series.station.source.clone(),
        records: series.records.len(),
        skipped_lines: series.skipped_lines,
        duplicate_days: series.duplicate_days,
        first_date: date(series.first_date()),
        last_date: date(series.last_date()),
        first_year,
        last_year,
        months,
        missing_months: aggregates.missing_months.iter().map(ToString::to_string).collect(),
        total_precip_mm: series.total_precip(),
        mean_monthly_mm: if months > 0 { total / months as f64 } else { 0.0 },
        monthly_trend: monthly_trend.map(TrendSummary::from),
        annual_trend: annual_trend.map(TrendSummary::from),
        outputs,
    }
}

/// Chart writer bound to one station's output directory
struct StationCharts<'a> {
    dir: &'a Path,
    name: &'a str,
}

impl StationCharts<'_> {
    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn monthly_series(&self, agg: &StationAggregates, trend: Option<&LinearFit>) -> Result<PathBuf> {
        let path = self.path("01_serie_temporal_mensal.svg");
        let points: Vec<(f64, f64)> = agg
            .monthly
            .iter()
            .map(|m| (m.period.decimal_year(), m.total_mm))
            .collect();
        let mut series = vec![Series::line("Precipitação mensal", points.clone(), STEEL_BLUE)
            .with_markers()
            .with_fill()];
        if let Some(fit) = trend {
            let line = points
                .iter()
                .enumerate()
                .map(|(i, &(x, _))| (x, fit.predict(i as f64)))
                .collect();
            series.push(Series::line(
                format!("Tendência linear (R²={:.3})", fit.r_squared()),
                line,
                TREND_RED,
            ));
        }
        let mean = Summary::from_values(&agg.monthly_totals())?.mean;

        let root = charts::svg_figure(&path, (1300, 600))?;
        charts::line_chart(
            &root,
            &LineChart {
                title: &format!("Série Temporal Mensal de Precipitação - {} (base ARIMA)", self.name),
                x_desc: "Data",
                y_desc: "Precipitação Total (mm)",
                series,
                ref_lines: vec![RefLine {
                    label: "Média histórica".to_string(),
                    y: mean,
                    color: MEAN_GREEN,
                }],
                x_axis: XAxis::Numeric(0),
            },
        )?;
        root.present()?;
        // The backend borrows `path` until dropped
        drop(root);
        Ok(path)
    }

    fn pentad_analysis(&self, agg: &StationAggregates) -> Result<PathBuf> {
        let path = self.path("02_analise_pentadal.svg");
        let root = charts::svg_figure(&path, (1400, 600))?;
        let body = charts::with_title(&root, &format!("Análise Pentadal - {}", self.name))?;
        let panels = body.split_evenly((1, 2));
        charts::bar_chart(
            &panels[0],
            &BarChart {
                title: "Precipitação Total por Pentada (acúmulo histórico)",
                x_desc: "Pentada",
                y_desc: "Precipitação (mm)",
                bars: pentad_bars(agg, |p| (p.total_mm, None)),
                decimals: 0,
                suffix: "",
            },
        )?;
        charts::bar_chart(
            &panels[1],
            &BarChart {
                title: "Precipitação Média Diária por Pentada (com desvio padrão)",
                x_desc: "Pentada",
                y_desc: "Precipitação Média Diária (mm)",
                bars: pentad_bars(agg, |p| (p.daily_mean, p.daily_std)),
                decimals: 2,
                suffix: "",
            },
        )?;
        root.present()?;
        drop(panels);
        drop(body);
        drop(root);
        Ok(path)
    }

    fn pentad_by_year(&self, agg: &StationAggregates) -> Result<PathBuf> {
        let path = self.path("02b_serie_pentadal_temporal.svg");
        let series = (1..=PENTADS_PER_MONTH)
            .zip(VIRIDIS_6)
            .map(|(pentad, color)| {
                let points = agg
                    .pentad_by_year
                    .iter()
                    .filter(|((_, p), _)| *p == pentad)
                    .map(|(&(year, _), &total)| (f64::from(year), total))
                    .collect();
                Series::line(format!("P{pentad}"), points, color).with_markers()
            })
            .collect();

        let root = charts::svg_figure(&path, (1300, 600))?;
        charts::line_chart(
            &root,
            &LineChart {
                title: &format!("Evolução Temporal da Precipitação por Pentada - {}", self.name),
                x_desc: "Ano",
                y_desc: "Precipitação Pentadal (mm)",
                series,
                ref_lines: Vec::new(),
                x_axis: XAxis::Numeric(0),
            },
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn annual(&self, agg: &StationAggregates, trend: Option<&LinearFit>) -> Result<PathBuf> {
        let path = self.path("03_precipitacao_anual_complementar.svg");
        let points: Vec<(f64, f64)> = agg.annual.iter().map(|&(y, t)| (f64::from(y), t)).collect();
        let mut series = vec![Series::line("Precipitação anual", points.clone(), STEEL_BLUE)
            .with_markers()
            .with_fill()];
        if let Some(fit) = trend {
            let line = points.iter().map(|&(x, _)| (x, fit.predict(x))).collect();
            series.push(Series::line(
                format!("Tendência (R²={:.3})", fit.r_squared()),
                line,
                TREND_RED,
            ));
        }
        let totals: Vec<f64> = points.iter().map(|p| p.1).collect();
        let mean = Summary::from_values(&totals)?.mean;

        let root = charts::svg_figure(&path, (1100, 600))?;
        charts::line_chart(
            &root,
            &LineChart {
                title: &format!("Precipitação Total Anual - {} (análise complementar)", self.name),
                x_desc: "Ano",
                y_desc: "Precipitação (mm)",
                series,
                ref_lines: vec![RefLine {
                    label: "Média histórica".to_string(),
                    y: mean,
                    color: MEAN_GREEN,
                }],
                x_axis: XAxis::Numeric(0),
            },
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn monthly_climatology(&self, agg: &StationAggregates) -> Result<PathBuf> {
        let path = self.path("04_climatologia_mensal.svg");
        let bars = agg
            .climatology_daily
            .iter()
            .zip(MONTH_RAMP)
            .map(|(c, color)| Bar {
                label: MONTH_LABELS[(c.month - 1) as usize].to_string(),
                value: c.mean,
                error: c.std,
                color,
            })
            .collect();

        let root = charts::svg_figure(&path, (1100, 600))?;
        charts::bar_chart(
            &root,
            &BarChart {
                title: &format!("Climatologia Mensal de Precipitação - {} (média de todos os anos)", self.name),
                x_desc: "Mês do Ano",
                y_desc: "Precipitação Média (mm)",
                bars,
                decimals: 1,
                suffix: "",
            },
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn daily_histogram(&self, series: &StationSeries) -> Result<PathBuf> {
        let path = self.path("05_histograma_precipitacao_diaria.svg");
        let rainy: Vec<f64> = series
            .records
            .iter()
            .map(|r| r.precip_mm)
            .filter(|&p| p > 0.0)
            .collect();

        let root = charts::svg_figure(&path, (1000, 600))?;
        let title = format!("Distribuição de Precipitação Diária - {}", self.name);
        if rainy.is_empty() {
            tracing::warn!(station = %self.name, "no rainy days; daily histogram left empty");
            charts::empty_chart(&root, &title, "Sem dias com chuva no registro")?;
        } else {
            let summary = Summary::from_values(&rainy)?;
            charts::histogram_chart(
                &root,
                &title,
                "Precipitação (mm)",
                &Histogram::new(&rainy, DAILY_HISTOGRAM_BINS)?,
                STEEL_BLUE,
                &format!("Dias com chuva (n={})", rainy.len()),
                &mean_median_markers(&summary),
            )?;
        }
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn annual_histogram(&self, agg: &StationAggregates) -> Result<PathBuf> {
        let path = self.path("06_histograma_anual.svg");
        let totals: Vec<f64> = agg.annual.iter().map(|&(_, t)| t).collect();
        let summary = Summary::from_values(&totals)?;

        let root = charts::svg_figure(&path, (1000, 600))?;
        charts::histogram_chart(
            &root,
            &format!("Distribuição de Precipitação Anual - {} (análise complementar)", self.name),
            "Precipitação Total Anual (mm)",
            &Histogram::new(&totals, ANNUAL_HISTOGRAM_BINS)?,
            CORAL,
            "",
            &mean_median_markers(&summary),
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn monthly_boxplot(&self, series: &StationSeries) -> Result<PathBuf> {
        let path = self.path("07_boxplot_mensal.svg");
        let by_month = daily_by_calendar_month(&series.records);
        let groups: Vec<BoxGroup> = by_month
            .into_iter()
            .zip(MONTH_LABELS)
            .zip(MONTH_RAMP)
            .map(|((values, label), color)| BoxGroup {
                label: label.to_string(),
                values,
                color,
            })
            .collect();

        let root = charts::svg_figure(&path, (1100, 600))?;
        charts::box_chart(
            &root,
            &format!("Variabilidade Mensal de Precipitação - {} (distribuição diária por mês)", self.name),
            "Mês do Ano",
            "Precipitação (mm)",
            &groups,
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }

    fn annual_boxplot(&self, agg: &StationAggregates) -> Result<PathBuf> {
        let path = self.path("08_boxplot_anual.svg");
        let groups = [BoxGroup {
            label: "Série completa".to_string(),
            values: agg.annual.iter().map(|&(_, t)| t).collect(),
            color: LIGHT_BLUE,
        }];

        let root = charts::svg_figure(&path, (800, 600))?;
        charts::box_chart(
            &root,
            &format!("Variabilidade Anual de Precipitação - {} (análise complementar)", self.name),
            "",
            "Precipitação Total Anual (mm)",
            &groups,
        )?;
        root.present()?;
        drop(root);
        Ok(path)
    }
}

fn pentad_bars(agg: &StationAggregates, value: impl Fn(&PentadValue) -> (f64, Option<f64>)) -> Vec<Bar> {
    agg.pentads
        .iter()
        .zip(VIRIDIS_6)
        .map(|(p, color)| {
            let (value, error) = value(p);
            Bar {
                label: pentad_label(p.pentad),
                value,
                error,
                color,
            }
        })
        .collect()
}

fn mean_median_markers(summary: &Summary) -> [Marker; 2] {
    [
        Marker {
            label: format!("Média={:.1} mm", summary.mean),
            x: summary.mean,
            color: TREND_RED,
        },
        Marker {
            label: format!("Mediana={:.1} mm", summary.median),
            x: summary.median,
            color: MEDIAN_GREEN,
        },
    ]
}
