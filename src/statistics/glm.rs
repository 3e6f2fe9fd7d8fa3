//! Generalized linear models fitted by iteratively re-weighted least squares
//!
//! Two families are supported, each with its canonical link:
//!
//! | family   | link                 | variance |
//! |----------|----------------------|----------|
//! | Gamma    | inverse, η = 1/μ     | μ²       |
//! | Gaussian | identity, η = μ      | 1        |
//!
//! The Gamma inverse link is only valid while the linear predictor stays
//! positive. When an update leaves that domain the step is halved towards
//! the previous estimate (the intercept-only model on the first iteration);
//! if no valid step is found the fit fails.

use super::linalg;
use crate::errors::{HidroError, Result};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis, Zip};
use serde::Serialize;
use std::fmt;

/// Maximum number of step halvings per IRLS iteration
const MAX_STEP_HALVINGS: usize = 30;

/// Error distribution of the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Gamma,
    Gaussian,
}

impl Family {
    /// All families, in report order
    pub const ALL: [Family; 2] = [Family::Gamma, Family::Gaussian];

    /// Lower-case name used in file names
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gamma => "gamma",
            Self::Gaussian => "gaussian",
        }
    }

    /// Capitalized name used in titles and tables
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Gamma => "Gamma",
            Self::Gaussian => "Gaussian",
        }
    }

    fn link(self, mu: f64) -> f64 {
        match self {
            Self::Gamma => 1.0 / mu,
            Self::Gaussian => mu,
        }
    }

    /// Mean response for a linear predictor value
    pub fn inverse_link(self, eta: f64) -> f64 {
        match self {
            Self::Gamma => 1.0 / eta,
            Self::Gaussian => eta,
        }
    }

    /// dη/dμ at `mu`
    fn link_derivative(self, mu: f64) -> f64 {
        match self {
            Self::Gamma => -1.0 / (mu * mu),
            Self::Gaussian => 1.0,
        }
    }

    fn variance(self, mu: f64) -> f64 {
        match self {
            Self::Gamma => mu * mu,
            Self::Gaussian => 1.0,
        }
    }

    fn valid_mean(self, mu: f64) -> bool {
        match self {
            Self::Gamma => mu.is_finite() && mu > 0.0,
            Self::Gaussian => mu.is_finite(),
        }
    }

    fn unit_deviance(self, y: f64, mu: f64) -> f64 {
        match self {
            Self::Gamma => 2.0 * (-(y / mu).ln() + (y - mu) / mu),
            Self::Gaussian => (y - mu).powi(2),
        }
    }

    fn check_response(self, y: ArrayView1<f64>) -> Result<()> {
        if y.iter().any(|v| !v.is_finite()) {
            return Err(HidroError::model_fit(self.title(), "response has non-finite values"));
        }
        if self == Self::Gamma && y.iter().any(|&v| v <= 0.0) {
            return Err(HidroError::model_fit(
                self.title(),
                "Gamma response must be strictly positive",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// IRLS controls
#[derive(Debug, Clone, Copy)]
pub struct GlmOptions {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-8,
        }
    }
}

/// A fitted model
#[derive(Debug, Clone, Serialize)]
pub struct GlmFit {
    pub family: Family,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub deviance: f64,
    /// Dispersion estimate (Pearson χ² / residual df)
    pub scale: f64,
    pub iterations: usize,
    pub converged: bool,
    pub nobs: usize,
}

impl GlmFit {
    /// Predicted mean response for each row of `design`
    pub fn predict(&self, design: ArrayView2<f64>) -> Result<Array1<f64>> {
        if design.ncols() != self.coefficients.len() {
            return Err(HidroError::Statistics(format!(
                "design has {} columns, model has {} coefficients",
                design.ncols(),
                self.coefficients.len()
            )));
        }
        let beta = Array1::from(self.coefficients.clone());
        let family = self.family;
        Ok(design.dot(&beta).mapv(|eta| family.inverse_link(eta)))
    }
}

/// Fit a GLM of `y` on the columns of `design` (include an intercept column
/// yourself).
///
/// # Errors
///
/// Fails when the response is outside the family's support, when there are
/// no residual degrees of freedom, when the weighted normal equations are
/// singular, or when no step keeps the mean inside the link's domain.
pub fn fit(
    design: ArrayView2<f64>,
    y: ArrayView1<f64>,
    family: Family,
    options: GlmOptions,
) -> Result<GlmFit> {
    let (n, p) = design.dim();
    if n != y.len() {
        return Err(HidroError::model_fit(
            family.title(),
            format!("design has {n} rows but response has {}", y.len()),
        ));
    }
    if n <= p {
        return Err(HidroError::insufficient(
            format!("GLM {family}"),
            p + 1,
            n,
        ));
    }
    family.check_response(y)?;

    let y_mean = y.sum() / n as f64;
    let mut mu = y.mapv(|v| (v + y_mean) / 2.0);
    let mut eta = mu.mapv(|m| family.link(m));
    let mut deviance = total_deviance(family, y, mu.view());
    let anchor = intercept_only_estimate(design, family, y_mean);
    let mut beta: Option<Array1<f64>> = None;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < options.max_iterations {
        iterations += 1;

        let (weights, working) = irls_terms(family, y, mu.view(), eta.view());
        let candidate = weighted_least_squares(design, weights.view(), working.view())
            .map_err(|e| HidroError::model_fit(family.title(), e.to_string()))?;

        let (next_beta, next_eta, next_mu) =
            constrain_step(design, family, beta.as_ref().or(anchor.as_ref()), candidate)?;
        let next_deviance = total_deviance(family, y, next_mu.view());

        let change = (next_deviance - deviance).abs();
        beta = Some(next_beta);
        eta = next_eta;
        mu = next_mu;
        deviance = next_deviance;

        if change <= options.tolerance * deviance.abs().max(1.0) {
            converged = true;
            break;
        }
    }

    let beta = beta.ok_or_else(|| HidroError::model_fit(family.title(), "no iterations run"))?;
    if !converged {
        tracing::warn!(family = %family, iterations, "GLM did not converge");
    }

    let df_resid = (n - p) as f64;
    let pearson: f64 = Zip::from(&y)
        .and(&mu)
        .fold(0.0, |acc, &yi, &mi| acc + (yi - mi).powi(2) / family.variance(mi));
    let scale = pearson / df_resid;

    let (weights, _) = irls_terms(family, y, mu.view(), eta.view());
    let xtwx = weighted_gram(design, weights.view());
    let covariance = linalg::invert(xtwx.view())
        .map_err(|e| HidroError::model_fit(family.title(), e.to_string()))?;
    let std_errors = covariance
        .diag()
        .iter()
        .map(|v| (v * scale).max(0.0).sqrt())
        .collect();

    Ok(GlmFit {
        family,
        coefficients: beta.to_vec(),
        std_errors,
        deviance,
        scale,
        iterations,
        converged,
        nobs: n,
    })
}

/// IRLS weights and working response at the current estimate
fn irls_terms(
    family: Family,
    y: ArrayView1<f64>,
    mu: ArrayView1<f64>,
    eta: ArrayView1<f64>,
) -> (Array1<f64>, Array1<f64>) {
    let mut weights = Array1::zeros(y.len());
    let mut working = Array1::zeros(y.len());
    Zip::from(&mut weights)
        .and(&mut working)
        .and(&y)
        .and(&mu)
        .and(&eta)
        .for_each(|w, z, &yi, &mi, &ei| {
            let g_prime = family.link_derivative(mi);
            *w = 1.0 / (g_prime * g_prime * family.variance(mi));
            *z = ei + (yi - mi) * g_prime;
        });
    (weights, working)
}

fn weighted_gram(design: ArrayView2<f64>, weights: ArrayView1<f64>) -> ndarray::Array2<f64> {
    let weighted = &design * &weights.insert_axis(Axis(1));
    design.t().dot(&weighted)
}

fn weighted_least_squares(
    design: ArrayView2<f64>,
    weights: ArrayView1<f64>,
    working: ArrayView1<f64>,
) -> Result<Array1<f64>> {
    let xtwx = weighted_gram(design, weights);
    let xtwz = design.t().dot(&(&working * &weights));
    linalg::solve(xtwx.view(), xtwz.view())
}

/// Coefficients whose linear predictor is `g(ȳ)` on every row, i.e.
/// `[g(ȳ), 0, ...]` when the first column is the intercept. Used as the
/// fallback point for step halving on the first iteration.
fn intercept_only_estimate(
    design: ArrayView2<f64>,
    family: Family,
    y_mean: f64,
) -> Option<Array1<f64>> {
    let n = design.nrows();
    let target = Array1::from_elem(n, family.link(y_mean));
    let beta = weighted_least_squares(design, Array1::ones(n).view(), target.view()).ok()?;
    let fitted = design.dot(&beta);
    fitted
        .iter()
        .all(|&eta| family.valid_mean(family.inverse_link(eta)))
        .then_some(beta)
}

/// Accept `candidate`, or halve the step from `previous` until the mean is
/// valid everywhere
fn constrain_step(
    design: ArrayView2<f64>,
    family: Family,
    previous: Option<&Array1<f64>>,
    candidate: Array1<f64>,
) -> Result<(Array1<f64>, Array1<f64>, Array1<f64>)> {
    let evaluate = |beta: &Array1<f64>| {
        let eta = design.dot(beta);
        let mu = eta.mapv(|e| family.inverse_link(e));
        let valid = mu.iter().all(|&m| family.valid_mean(m));
        (eta, mu, valid)
    };

    let (eta, mu, valid) = evaluate(&candidate);
    if valid {
        return Ok((candidate, eta, mu));
    }

    let previous = previous.ok_or_else(|| {
        HidroError::model_fit(
            family.title(),
            "intercept-only model puts the mean outside the link domain",
        )
    })?;

    let mut step = &candidate - previous;
    for _ in 0..MAX_STEP_HALVINGS {
        step.mapv_inplace(|s| s / 2.0);
        let beta = previous + &step;
        let (eta, mu, valid) = evaluate(&beta);
        if valid {
            tracing::trace!(family = %family, "IRLS step halved");
            return Ok((beta, eta, mu));
        }
    }

    Err(HidroError::model_fit(
        family.title(),
        "no step keeps the fitted mean inside the link domain",
    ))
}

fn total_deviance(family: Family, y: ArrayView1<f64>, mu: ArrayView1<f64>) -> f64 {
    Zip::from(&y)
        .and(&mu)
        .fold(0.0, |acc, &yi, &mi| acc + family.unit_deviance(yi, mi))
}
