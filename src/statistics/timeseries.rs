//! Time-series diagnostics: autocorrelation and the augmented Dickey-Fuller test

use super::linalg;
use crate::errors::{HidroError, Result};
use ndarray::{s, Array1, Array2};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

/// Sample autocorrelation for lags `0..=nlags` (biased estimator, lag 0 is 1)
pub fn acf(x: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let n = x.len();
    if n < 2 {
        return Err(HidroError::insufficient("autocorrelation", 2, n));
    }
    let mean = x.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let denom: f64 = centered.iter().map(|v| v * v).sum();
    if denom == 0.0 {
        return Err(HidroError::Statistics(
            "autocorrelation of a constant series is undefined".to_string(),
        ));
    }

    let nlags = nlags.min(n - 1);
    Ok((0..=nlags)
        .map(|lag| {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denom
        })
        .collect())
}

/// Partial autocorrelation for lags `0..=nlags` from the Yule-Walker
/// equations (Durbin-Levinson recursion over the biased ACF)
pub fn pacf_yule_walker(x: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let rho = acf(x, nlags)?;
    let nlags = rho.len() - 1;
    let mut pacf = Vec::with_capacity(nlags + 1);
    pacf.push(1.0);
    if nlags == 0 {
        return Ok(pacf);
    }

    let mut phi = vec![rho[1]];
    let mut sigma = 1.0 - rho[1] * rho[1];
    pacf.push(rho[1]);

    for k in 2..=nlags {
        let num = rho[k]
            - phi
                .iter()
                .enumerate()
                .map(|(j, p)| p * rho[k - 1 - j])
                .sum::<f64>();
        let phi_kk = if sigma.abs() < f64::EPSILON { 0.0 } else { num / sigma };
        let previous = phi.clone();
        for j in 0..phi.len() {
            phi[j] = previous[j] - phi_kk * previous[k - 2 - j];
        }
        phi.push(phi_kk);
        sigma *= 1.0 - phi_kk * phi_kk;
        pacf.push(phi_kk);
    }

    Ok(pacf)
}

/// Half-width of the approximate 95 % band for white noise
pub fn confidence_band(n: usize) -> f64 {
    1.96 / (n.max(1) as f64).sqrt()
}

/// Critical values of the ADF statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

/// Outcome of an augmented Dickey-Fuller test with a constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// AIC of the selected lag order
    pub ic_best: f64,
}

impl AdfResult {
    /// Whether the unit-root hypothesis is rejected at `alpha`
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Augmented Dickey-Fuller test with a constant term, lag order picked by
/// AIC up to `ceil(12 * (n / 100)^(1/4))`.
///
/// # Errors
///
/// Fails when the series is too short for even a zero-lag regression, or if
/// a regression is singular (e.g. a constant series).
pub fn adf_test(x: &[f64]) -> Result<AdfResult> {
    let n = x.len();
    let default_lag = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let cap = (n / 2).checked_sub(2).ok_or_else(|| HidroError::insufficient("ADF test", 6, n))?;
    let max_lag = default_lag.min(cap);

    let diff: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample of the largest model.
    let (design, response) = adf_regression(x, &diff, max_lag, max_lag);
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let fit = linalg::ols(design.slice(s![.., ..lag + 2]), response.view())?;
        let aic = fit.aic();
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }
    let (used_lag, ic_best) = best.unwrap_or((0, f64::NAN));

    let (design, response) = adf_regression(x, &diff, used_lag, used_lag);
    let fit = linalg::ols(design.view(), response.view())?;
    let statistic = fit.t_value(1);
    let nobs = response.len();

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values: mackinnon_critical_values(nobs),
        ic_best,
    })
}

/// Columns `[1, y_{t-1}, Δy_{t-1}, ..., Δy_{t-lags}]` against `Δy_t`, using
/// the sample that allows `sample_lag` lagged differences.
fn adf_regression(
    x: &[f64],
    diff: &[f64],
    lags: usize,
    sample_lag: usize,
) -> (Array2<f64>, Array1<f64>) {
    let nobs = diff.len() - sample_lag;
    let mut design = Array2::zeros((nobs, lags + 2));
    let mut response = Array1::zeros(nobs);
    for row in 0..nobs {
        let t = row + sample_lag;
        response[row] = diff[t];
        design[[row, 0]] = 1.0;
        design[[row, 1]] = x[t];
        for lag in 1..=lags {
            design[[row, lag + 1]] = diff[t - lag];
        }
    }
    (design, response)
}

/// MacKinnon (1994) approximate p-value for the constant-only, single
/// series case
fn mackinnon_p_value(statistic: f64) -> f64 {
    const TAU_MAX: f64 = 2.74;
    const TAU_MIN: f64 = -18.83;
    const TAU_STAR: f64 = -1.61;
    const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
    const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let poly: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    let z = poly.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    Normal::new(0.0, 1.0).map(|d| d.cdf(z)).unwrap_or(f64::NAN)
}

/// MacKinnon (2010) response-surface critical values for `nobs` observations
fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs.max(1) as f64;
    let surface = |c: [f64; 4]| c[0] + c[1] * inv + c[2] * inv.powi(2) + c[3] * inv.powi(3);
    CriticalValues {
        one_percent: surface([-3.43035, -6.5393, -16.786, -79.433]),
        five_percent: surface([-2.86154, -2.8903, -4.234, -40.040]),
        ten_percent: surface([-2.56677, -1.5384, -2.809, 0.0]),
    }
}
