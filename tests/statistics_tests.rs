//! Tests for the statistics layer: summaries, regression, GLMs and the
//! time-series diagnostics

use hidroanalise::statistics::{
    acf, adf_test,
    descriptive::quantile,
    glm::{fit, Family, GlmOptions},
    linalg::{invert, ols, solve},
    linregress,
    metrics::{mae, r2_score, rmse},
    pacf_yule_walker,
    timeseries::confidence_band,
    ErrorMetrics, Histogram, StatOperation, StatisticalReduction, Summary,
};
use hidroanalise::errors::HidroError;
use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected}, got {actual} (tolerance {tol})"
    );
}

/// Standard normal draws via Box-Muller
fn gaussian_noise(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
            let u2: f64 = rng.gen();
            (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        })
        .collect()
}

#[test]
fn test_stat_operations() {
    let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(values.reduce(StatOperation::Sum), Some(40.0));
    assert_eq!(values.reduce(StatOperation::Count), Some(8.0));
    assert_eq!(values.reduce(StatOperation::Mean), Some(5.0));
    assert_eq!(values.reduce(StatOperation::Min), Some(2.0));
    assert_eq!(values.reduce(StatOperation::Max), Some(9.0));
    assert_close(values.reduce(StatOperation::Std).unwrap(), (32.0f64 / 7.0).sqrt(), 1e-12);

    let single = [3.0];
    assert_eq!(single.reduce(StatOperation::Std), None);
    assert!(matches!(
        single.try_reduce(StatOperation::Std),
        Err(HidroError::InsufficientData { needed: 2, got: 1, .. })
    ));
    let empty: [f64; 0] = [];
    assert_eq!(empty.reduce(StatOperation::Sum), Some(0.0));
    assert_eq!(empty.reduce(StatOperation::Mean), None);
}

#[test]
fn test_summary_and_quantiles() {
    let summary = Summary::from_values(&[5.0, 1.0, 4.0, 2.0, 3.0, f64::NAN]).unwrap();
    assert_eq!(summary.count, 5);
    assert_close(summary.mean, 3.0, 1e-12);
    assert_close(summary.median, 3.0, 1e-12);
    assert_close(summary.q1, 2.0, 1e-12);
    assert_close(summary.q3, 4.0, 1e-12);
    assert_close(summary.iqr(), 2.0, 1e-12);
    assert_eq!(summary.min, 1.0);
    assert_eq!(summary.max, 5.0);
    assert_close(summary.std, 2.5f64.sqrt(), 1e-12);
    assert_close(summary.coefficient_of_variation(), 2.5f64.sqrt() / 3.0 * 100.0, 1e-9);

    assert_close(quantile(&[0.0, 10.0], 0.25), 2.5, 1e-12);
    assert_close(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5, 1e-12);

    assert!(Summary::from_values(&[]).is_err());
}

#[test]
fn test_histogram_includes_maximum() {
    let histogram = Histogram::new(&[0.0, 1.0, 2.0, 3.0, 4.0], 2).unwrap();
    assert_eq!(histogram.edges, vec![0.0, 2.0, 4.0]);
    assert_eq!(histogram.counts, vec![2, 3]);
    assert_eq!(histogram.max_count(), 3);

    let constant = Histogram::new(&[7.0, 7.0], 3).unwrap();
    assert_eq!(constant.counts.iter().sum::<usize>(), 2);

    assert!(Histogram::new(&[], 10).is_err());
}

#[test]
fn test_linregress_closed_form() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [2.0, 4.0, 5.0, 4.0, 5.0];
    let fit = linregress(&x, &y).unwrap();

    assert_close(fit.slope, 0.6, 1e-12);
    assert_close(fit.intercept, 2.2, 1e-12);
    assert_close(fit.r_squared(), 0.6, 1e-12);
    assert_close(fit.std_err, 0.08f64.sqrt(), 1e-12);
    assert!(fit.p_value > 0.11 && fit.p_value < 0.14, "p = {}", fit.p_value);
    assert_close(fit.predict(6.0), 5.8, 1e-12);
}

#[test]
fn test_linregress_perfect_and_degenerate() {
    let x: Vec<f64> = (0..10).map(f64::from).collect();
    let y: Vec<f64> = x.iter().map(|v| 3.0 - 2.0 * v).collect();
    let fit = linregress(&x, &y).unwrap();
    assert_close(fit.slope, -2.0, 1e-12);
    assert_close(fit.r_value, -1.0, 1e-12);
    assert_eq!(fit.p_value, 0.0);

    assert!(linregress(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    assert!(linregress(&[1.0], &[1.0]).is_err());
    assert!(linregress(&[1.0, 2.0], &[1.0]).is_err());
}

#[test]
fn test_linear_algebra() {
    let a = array![[4.0, 1.0], [2.0, 3.0]];
    let b = array![1.0, 2.0];
    let x = solve(a.view(), b.view()).unwrap();
    assert_close(x[0], 0.1, 1e-12);
    assert_close(x[1], 0.6, 1e-12);

    let inv = invert(a.view()).unwrap();
    let identity = a.dot(&inv);
    for i in 0..2 {
        for j in 0..2 {
            assert_close(identity[[i, j]], if i == j { 1.0 } else { 0.0 }, 1e-12);
        }
    }

    let singular = array![[1.0, 2.0], [2.0, 4.0]];
    assert!(matches!(
        solve(singular.view(), b.view()),
        Err(HidroError::SingularMatrix(_))
    ));
}

fn design_with_intercept(columns: &[Vec<f64>]) -> Array2<f64> {
    let n = columns[0].len();
    Array2::from_shape_fn((n, columns.len() + 1), |(i, j)| {
        if j == 0 {
            1.0
        } else {
            columns[j - 1][i]
        }
    })
}

#[test]
fn test_gaussian_glm_matches_ols() {
    let noise = gaussian_noise(60, 7);
    let t: Vec<f64> = (0..60).map(f64::from).collect();
    let month: Vec<f64> = (0..60).map(|i| f64::from(i % 12 + 1)).collect();
    let y: Array1<f64> = (0..60)
        .map(|i| 50.0 + 0.8 * t[i] - 3.0 * month[i] + 10.0 * noise[i])
        .collect();
    let design = design_with_intercept(&[t, month]);

    let glm = fit(design.view(), y.view(), Family::Gaussian, GlmOptions::default()).unwrap();
    let ols = ols(design.view(), y.view()).unwrap();

    assert!(glm.converged);
    for (g, o) in glm.coefficients.iter().zip(ols.coefficients.iter()) {
        assert_close(*g, *o, 1e-8);
    }
    for (g, o) in glm.std_errors.iter().zip(ols.std_errors.iter()) {
        assert_close(*g, *o, 1e-8);
    }
    assert_close(glm.deviance, ols.ssr, 1e-6);
}

#[test]
fn test_gamma_glm_recovers_noiseless_coefficients() {
    let x: Vec<f64> = (0..40).map(|i| f64::from(i) / 4.0).collect();
    let y: Array1<f64> = x.iter().map(|v| 1.0 / (0.05 + 0.02 * v)).collect();
    let design = design_with_intercept(&[x]);
    let options = GlmOptions {
        max_iterations: 200,
        tolerance: 1e-14,
    };

    let glm = fit(design.view(), y.view(), Family::Gamma, options).unwrap();
    assert_close(glm.coefficients[0], 0.05, 1e-6);
    assert_close(glm.coefficients[1], 0.02, 1e-6);
    assert!(glm.deviance < 1e-8);

    let predicted = glm.predict(design.view()).unwrap();
    for (p, o) in predicted.iter().zip(y.iter()) {
        assert_close(*p, *o, 1e-4 * o.abs());
    }
}

#[test]
fn test_gamma_glm_halves_first_step_towards_intercept_only_model() {
    // The first weighted least-squares update drives the linear predictor
    // negative on the last rows of this steeply decaying series
    let x: Vec<f64> = (0..10).map(f64::from).collect();
    let y = array![50.0, 40.0, 30.0, 20.0, 10.0, 5.0, 2.0, 1.0, 0.5, 0.1];
    let design = design_with_intercept(&[x]);

    let glm = fit(design.view(), y.view(), Family::Gamma, GlmOptions::default()).unwrap();
    assert!(glm.converged);
    assert_close(glm.coefficients[0], 0.011707, 1e-5);
    assert_close(glm.coefficients[1], 0.032717, 1e-5);

    let predicted = glm.predict(design.view()).unwrap();
    assert!(predicted.iter().all(|&mu| mu.is_finite() && mu > 0.0));
    // Canonical link: residuals sum to zero at the optimum
    let residual_sum: f64 = y.iter().zip(predicted.iter()).map(|(o, p)| o - p).sum();
    assert_close(residual_sum, 0.0, 1e-3);
}

#[test]
fn test_gamma_glm_rejects_non_positive_response() {
    let design = design_with_intercept(&[vec![1.0, 2.0, 3.0, 4.0]]);
    let y = array![1.0, 0.0, 2.0, 3.0];
    let err = fit(design.view(), y.view(), Family::Gamma, GlmOptions::default()).unwrap_err();
    assert!(matches!(err, HidroError::ModelFit { .. }));

    let too_few = design_with_intercept(&[vec![1.0, 2.0]]);
    let y = array![1.0, 2.0];
    assert!(fit(too_few.view(), y.view(), Family::Gaussian, GlmOptions::default()).is_err());
}

#[test]
fn test_error_metrics() {
    let observed = [1.0, 2.0, 3.0];
    let predicted = [1.0, 2.0, 4.0];
    assert_close(mae(&observed, &predicted).unwrap(), 1.0 / 3.0, 1e-12);
    assert_close(rmse(&observed, &predicted).unwrap(), (1.0f64 / 3.0).sqrt(), 1e-12);
    assert_close(r2_score(&observed, &predicted).unwrap(), 0.5, 1e-12);

    let metrics = ErrorMetrics::compute(&observed, &observed).unwrap();
    assert_eq!(metrics.mae, 0.0);
    assert_eq!(metrics.r2, 1.0);

    assert!(mae(&observed, &predicted[..2]).is_err());
    assert!(rmse(&[], &[]).is_err());
    assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]).unwrap(), 1.0);
}

#[test]
fn test_acf_and_pacf() {
    let alternating: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    let rho = acf(&alternating, 4).unwrap();
    assert_eq!(rho.len(), 5);
    assert_close(rho[0], 1.0, 1e-12);
    assert_close(rho[1], -49.0 / 50.0, 1e-12);
    assert_close(rho[2], 48.0 / 50.0, 1e-12);

    let pacf = pacf_yule_walker(&alternating, 4).unwrap();
    assert_eq!(pacf.len(), 5);
    assert_close(pacf[1], rho[1], 1e-12);

    // Lags are capped at n - 1
    assert_eq!(acf(&[1.0, 2.0, 4.0], 24).unwrap().len(), 3);
    assert!(acf(&[1.0, 1.0, 1.0], 2).is_err());
    assert!(acf(&[1.0], 2).is_err());

    assert_close(confidence_band(100), 0.196, 1e-12);
}

#[test]
fn test_adf_white_noise_is_stationary() {
    for seed in 0..10 {
        let noise = gaussian_noise(300, seed);
        let result = adf_test(&noise).unwrap();
        assert!(result.is_stationary(0.05), "seed {seed}: p = {}", result.p_value);
        assert!(result.statistic < result.critical_values.five_percent);
    }
}

#[test]
fn test_adf_random_walk_keeps_unit_root() {
    let not_rejected = (100..110)
        .filter(|&seed| {
            let mut level = 0.0;
            let walk: Vec<f64> = gaussian_noise(300, seed)
                .into_iter()
                .map(|step| {
                    level += step;
                    level
                })
                .collect();
            !adf_test(&walk).unwrap().is_stationary(0.05)
        })
        .count();
    assert!(not_rejected >= 7, "unit root kept for only {not_rejected}/10 walks");
}

#[test]
fn test_adf_critical_values_are_ordered() {
    let result = adf_test(&gaussian_noise(120, 3)).unwrap();
    let cv = result.critical_values;
    assert!(cv.one_percent < cv.five_percent && cv.five_percent < cv.ten_percent);
    assert!(result.nobs < 120);
    assert!((0.0..=1.0).contains(&result.p_value));

    assert!(adf_test(&[1.0, 2.0, 3.0]).is_err());
}
