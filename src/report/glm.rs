//! GLM prediction of monthly totals (`glm`)
//!
//! Each station's monthly series is modelled from three features: the
//! month index `t`, the calendar month `mes` and the previous month's total
//! `precip_lag1`, plus an intercept. Rows are split 80/20 into train and
//! test sets with a seeded shuffle, so reruns produce identical outputs.

use super::{load_configured_series, StationMonthly, GLM_DIR};
use crate::charts::{self, rgb, LineChart, Reference, Series, XAxis, GREY, STEEL_BLUE, TREND_RED};
use crate::config::{Config, GlmConfig};
use crate::errors::{HidroError, Result};
use crate::export::{write_json, write_rows, MonthlyPoint};
use crate::statistics::glm::{self as model, Family, GlmFit, GlmOptions};
use crate::statistics::timeseries::confidence_band;
use crate::statistics::{acf, linregress, ErrorMetrics, Histogram};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use std::fs;
use std::path::{Path, PathBuf};

/// Names of the design matrix columns, intercept first
pub const FEATURES: [&str; 4] = ["const", "t", "mes", "precip_lag1"];

const RESIDUAL_ACF_LAGS: usize = 20;
const RESIDUAL_HISTOGRAM_BINS: usize = 15;

/// Model inputs after lagging and family-specific filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlmDataset {
    pub t: Vec<f64>,
    pub month: Vec<f64>,
    pub lag1: Vec<f64>,
    pub y: Vec<f64>,
}

impl GlmDataset {
    /// Build the dataset from an ascending monthly series. The first month
    /// has no lag and is dropped; Gamma also drops non-positive totals.
    pub fn from_points(points: &[MonthlyPoint], family: Family) -> Self {
        let mut data = Self::default();
        for (t, pair) in points.windows(2).enumerate() {
            let (previous, current) = (pair[0], pair[1]);
            if family == Family::Gamma && current.precip_mm <= 0.0 {
                continue;
            }
            data.t.push((t + 1) as f64);
            data.month.push(f64::from(current.period.month));
            data.lag1.push(previous.precip_mm);
            data.y.push(current.precip_mm);
        }
        data
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Design matrix `[1, t, mes, precip_lag1]` for the given rows
    pub fn design(&self, rows: &[usize]) -> Array2<f64> {
        Array2::from_shape_fn((rows.len(), FEATURES.len()), |(i, j)| {
            let r = rows[i];
            match j {
                0 => 1.0,
                1 => self.t[r],
                2 => self.month[r],
                _ => self.lag1[r],
            }
        })
    }

    pub fn response(&self, rows: &[usize]) -> Array1<f64> {
        rows.iter().map(|&r| self.y[r]).collect()
    }
}

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and take the first `ceil(n * test_fraction)`
/// rows as the test set
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    let mut rows: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    let test_len = ((n as f64 * test_fraction).ceil() as usize).min(n);
    let train = rows.split_off(test_len);
    Split { train, test: rows }
}

/// A fitted model with its data and scores
#[derive(Debug, Clone)]
pub struct ModelRun {
    pub family: Family,
    pub fit: GlmFit,
    pub data: GlmDataset,
    pub split: Split,
    pub train_pred: Vec<f64>,
    pub test_pred: Vec<f64>,
    pub train_metrics: ErrorMetrics,
    pub test_metrics: ErrorMetrics,
}

impl ModelRun {
    fn observed(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter().map(|&r| self.data.y[r]).collect()
    }

    /// Test-set residuals, observed minus predicted
    pub fn test_residuals(&self) -> Vec<f64> {
        self.observed(&self.split.test)
            .iter()
            .zip(&self.test_pred)
            .map(|(o, p)| o - p)
            .collect()
    }

    /// Predictions for every row of the dataset, in row order
    pub fn full_predictions(&self) -> Result<Vec<f64>> {
        let rows: Vec<usize> = (0..self.data.len()).collect();
        Ok(self.fit.predict(self.data.design(&rows).view())?.to_vec())
    }
}

/// Fit one family to a station's monthly series
///
/// # Errors
///
/// [`HidroError::InsufficientData`] below `settings.min_rows` usable rows,
/// or any error from the IRLS fit.
pub fn fit_family(points: &[MonthlyPoint], family: Family, settings: &GlmConfig) -> Result<ModelRun> {
    let data = GlmDataset::from_points(points, family);
    if data.len() < settings.min_rows {
        return Err(HidroError::insufficient(
            format!("GLM {family}"),
            settings.min_rows,
            data.len(),
        ));
    }

    let split = train_test_split(data.len(), settings.test_fraction, settings.seed);
    let options = GlmOptions {
        max_iterations: settings.max_iterations,
        tolerance: settings.tolerance,
    };
    let train_x = data.design(&split.train);
    let test_x = data.design(&split.test);
    let train_y = data.response(&split.train);
    let test_y = data.response(&split.test);

    let fit = model::fit(train_x.view(), train_y.view(), family, options)?;
    if !fit.converged {
        tracing::warn!(%family, iterations = fit.iterations, "IRLS did not converge");
    }
    let train_pred = fit.predict(train_x.view())?.to_vec();
    let test_pred = fit.predict(test_x.view())?.to_vec();
    let train_metrics = ErrorMetrics::compute(&train_y.to_vec(), &train_pred)?;
    let test_metrics = ErrorMetrics::compute(&test_y.to_vec(), &test_pred)?;

    Ok(ModelRun {
        family,
        fit,
        data,
        split,
        train_pred,
        test_pred,
        train_metrics,
        test_metrics,
    })
}

/// Row of `metricas_glm.csv`
#[derive(Debug, Clone, Serialize)]
pub struct MetricsRow {
    #[serde(rename = "Estação")]
    pub station: String,
    #[serde(rename = "Distribuição")]
    pub family: String,
    #[serde(rename = "MAE Treino")]
    pub mae_train: f64,
    #[serde(rename = "MAE Teste")]
    pub mae_test: f64,
    #[serde(rename = "RMSE Treino")]
    pub rmse_train: f64,
    #[serde(rename = "RMSE Teste")]
    pub rmse_test: f64,
    #[serde(rename = "R² Treino")]
    pub r2_train: f64,
    #[serde(rename = "R² Teste")]
    pub r2_test: f64,
}

impl MetricsRow {
    fn new(station: &str, run: &ModelRun) -> Self {
        Self {
            station: station.to_string(),
            family: run.family.title().to_string(),
            mae_train: run.train_metrics.mae,
            mae_test: run.test_metrics.mae,
            rmse_train: run.train_metrics.rmse,
            rmse_test: run.test_metrics.rmse,
            r2_train: run.train_metrics.r2,
            r2_test: run.test_metrics.r2,
        }
    }
}

/// Contents of `modelo_<family>.json`
#[derive(Debug, Serialize)]
struct ModelReport<'a> {
    station: &'a str,
    family: Family,
    features: [&'static str; 4],
    coefficients: &'a [f64],
    std_errors: &'a [f64],
    deviance: f64,
    scale: f64,
    iterations: usize,
    converged: bool,
    rows: usize,
    train_rows: usize,
    test_rows: usize,
    seed: u64,
    train: ErrorMetrics,
    test: ErrorMetrics,
}

#[derive(Debug, Default)]
pub struct GlmSummary {
    pub metrics: Vec<MetricsRow>,
    pub skipped: Vec<(String, Family, String)>,
    pub metrics_path: Option<PathBuf>,
}

impl GlmSummary {
    pub fn print(&self) {
        println!("GLM models:");
        println!(
            "   {:<24} {:<9} {:>9} {:>9} {:>8}",
            "Station", "Family", "MAE test", "RMSE test", "R² test"
        );
        for row in &self.metrics {
            println!(
                "   {:<24} {:<9} {:>9.2} {:>9.2} {:>8.3}",
                row.station, row.family, row.mae_test, row.rmse_test, row.r2_test
            );
        }
        for (station, family, reason) in &self.skipped {
            println!("   skipped {station} ({family}): {reason}");
        }
        if let Some(path) = &self.metrics_path {
            println!("   Metrics: {}", path.display());
        }
    }
}

/// Fit both families for every configured station with a monthly series
pub fn glm(config: &Config) -> Result<GlmSummary> {
    let stations = load_configured_series(config, &config.output_dir);
    let root = config.output_dir.join(GLM_DIR);
    fs::create_dir_all(&root)?;

    let mut summary = GlmSummary::default();
    if stations.is_empty() {
        tracing::warn!("no monthly series available; nothing to model");
        return Ok(summary);
    }

    for station in &stations {
        let dir = root.join(&station.slug);
        fs::create_dir_all(&dir)?;
        for family in Family::ALL {
            let outcome = fit_family(&station.points, family, &config.glm)
                .and_then(|run| write_model_outputs(station, &run, &dir, config.glm.seed).map(|()| run));
            match outcome {
                Ok(run) => {
                    tracing::info!(
                        station = %station.name,
                        %family,
                        r2_test = run.test_metrics.r2,
                        rmse_test = run.test_metrics.rmse,
                        "GLM fitted"
                    );
                    summary.metrics.push(MetricsRow::new(&station.name, &run));
                }
                Err(e) => {
                    tracing::warn!(station = %station.name, %family, error = %e, "GLM skipped");
                    summary.skipped.push((station.name.clone(), family, e.to_string()));
                }
            }
        }
    }

    let path = root.join("metricas_glm.csv");
    write_rows(&path, &summary.metrics)?;
    summary.metrics_path = Some(path);
    Ok(summary)
}

fn write_model_outputs(station: &StationMonthly, run: &ModelRun, dir: &Path, seed: u64) -> Result<()> {
    let name = run.family.as_str();
    prediction_scatter(station, run, &dir.join(format!("01_predicao_vs_observado_{name}.svg")))?;
    prediction_series(station, run, &dir.join(format!("02_serie_temporal_predicao_{name}.svg")))?;
    residual_diagnostics(station, run, &dir.join(format!("03_diagnostico_residuos_{name}.svg")))?;
    write_json(
        &dir.join(format!("modelo_{name}.json")),
        &ModelReport {
            station: &station.name,
            family: run.family,
            features: FEATURES,
            coefficients: &run.fit.coefficients,
            std_errors: &run.fit.std_errors,
            deviance: run.fit.deviance,
            scale: run.fit.scale,
            iterations: run.fit.iterations,
            converged: run.fit.converged,
            rows: run.data.len(),
            train_rows: run.split.train.len(),
            test_rows: run.split.test.len(),
            seed,
            train: run.train_metrics,
            test: run.test_metrics,
        },
    )
}

fn pairs(observed: &[f64], predicted: &[f64]) -> Vec<(f64, f64)> {
    observed.iter().copied().zip(predicted.iter().copied()).collect()
}

fn prediction_scatter(station: &StationMonthly, run: &ModelRun, path: &Path) -> Result<()> {
    let color = rgb(station.color);
    let root = charts::svg_figure(path, (1400, 550))?;
    let panels = root.split_evenly((1, 2));
    let sets = [
        ("Treino", &run.split.train, &run.train_pred),
        ("Teste", &run.split.test, &run.test_pred),
    ];
    for (panel, (label, rows, predicted)) in panels.iter().zip(sets) {
        charts::scatter_chart(
            panel,
            &format!("{label} - {} (GLM {})", station.name, run.family),
            "Precipitação Observada (mm)",
            "Precipitação Predita (mm)",
            &pairs(&run.observed(rows), predicted),
            color,
            Reference::Identity,
        )?;
    }
    root.present()?;
    Ok(())
}

fn prediction_series(station: &StationMonthly, run: &ModelRun, path: &Path) -> Result<()> {
    let predicted = run.full_predictions()?;
    let indexed = |values: &[f64]| -> Vec<(f64, f64)> {
        values.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect()
    };
    let root = charts::svg_figure(path, (1400, 600))?;
    charts::line_chart(
        &root,
        &LineChart {
            title: &format!(
                "Série Temporal com Predição GLM - {} (distribuição: {})",
                station.name,
                run.family.as_str()
            ),
            x_desc: "Mês",
            y_desc: "Precipitação (mm)",
            series: vec![
                Series::line("Observado", indexed(&run.data.y), rgb(station.color)).with_markers(),
                Series::line("Predito (GLM)", indexed(&predicted), TREND_RED),
            ],
            ref_lines: Vec::new(),
            x_axis: XAxis::Numeric(0),
        },
    )?;
    root.present()?;
    Ok(())
}

/// Theoretical normal quantiles for a sample of size `n`, using Filliben's
/// order statistic medians
pub fn normal_order_statistics(n: usize) -> Result<Vec<f64>> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| HidroError::Statistics(e.to_string()))?;
    if n == 0 {
        return Ok(Vec::new());
    }
    let nf = n as f64;
    let last = 0.5_f64.powf(1.0 / nf);
    Ok((1..=n)
        .map(|i| {
            let p = if i == 1 {
                1.0 - last
            } else if i == n {
                last
            } else {
                (i as f64 - 0.3175) / (nf + 0.365)
            };
            normal.inverse_cdf(p)
        })
        .collect())
}

fn residual_diagnostics(station: &StationMonthly, run: &ModelRun, path: &Path) -> Result<()> {
    let color = rgb(station.color);
    let residuals = run.test_residuals();
    let root = charts::svg_figure(path, (1200, 1000))?;
    let body = charts::with_title(
        &root,
        &format!("Diagnóstico de Resíduos - {} (GLM {})", station.name, run.family),
    )?;
    let panels = body.split_evenly((2, 2));

    charts::scatter_chart(
        &panels[0],
        "Resíduos vs Preditos",
        "Valores Preditos",
        "Resíduos",
        &pairs(&run.test_pred, &residuals),
        color,
        Reference::Zero,
    )?;

    match Histogram::new(&residuals, RESIDUAL_HISTOGRAM_BINS) {
        Ok(histogram) => charts::histogram_chart(
            &panels[1],
            "Distribuição dos Resíduos",
            "Resíduos",
            &histogram,
            color,
            "",
            &[],
        )?,
        Err(_) => charts::empty_chart(&panels[1], "Distribuição dos Resíduos", "sem resíduos")?,
    }

    let mut sorted = residuals.clone();
    sorted.sort_by(f64::total_cmp);
    let theoretical = normal_order_statistics(sorted.len())?;
    let reference = match linregress(&theoretical, &sorted) {
        Ok(fit) => Reference::Line {
            slope: fit.slope,
            intercept: fit.intercept,
        },
        Err(_) => Reference::None,
    };
    charts::scatter_chart(
        &panels[2],
        "Q-Q Plot",
        "Quantis Teóricos",
        "Valores Ordenados",
        &pairs(&theoretical, &sorted),
        STEEL_BLUE,
        reference,
    )?;

    match acf(&residuals, RESIDUAL_ACF_LAGS) {
        Ok(values) => charts::correlogram(
            &panels[3],
            "Autocorrelação dos Resíduos",
            "ACF",
            &values,
            confidence_band(residuals.len()),
            GREY,
        )?,
        Err(e) => {
            tracing::debug!(error = %e, "residual ACF unavailable");
            charts::empty_chart(&panels[3], "Autocorrelação dos Resíduos", "indisponível")?;
        }
    }

    root.present()?;
    Ok(())
}
