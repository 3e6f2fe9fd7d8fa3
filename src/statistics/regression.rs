//! Simple linear regression with significance test

use crate::errors::{HidroError, Result};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Least-squares line `y = intercept + slope * x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient
    pub r_value: f64,
    /// Two-sided p-value for a zero slope
    pub p_value: f64,
    /// Standard error of the slope
    pub std_err: f64,
}

impl LinearFit {
    pub fn r_squared(&self) -> f64 {
        self.r_value * self.r_value
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a least-squares line through `(x, y)`
///
/// # Errors
///
/// Returns an error if the inputs differ in length, have fewer than two
/// points, or if all `x` are equal.
pub fn linregress(x: &[f64], y: &[f64]) -> Result<LinearFit> {
    if x.len() != y.len() {
        return Err(HidroError::Statistics(format!(
            "x and y lengths differ: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(HidroError::insufficient("linear regression", 2, n));
    }

    let nf = n as f64;
    let x_mean = x.iter().sum::<f64>() / nf;
    let y_mean = y.iter().sum::<f64>() / nf;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 {
        return Err(HidroError::Statistics(
            "cannot fit a line when all x values are identical".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_value = if syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let (p_value, std_err) = if n == 2 {
        // Two points always lie on the line.
        (if r_value == 0.0 { 1.0 } else { 0.0 }, 0.0)
    } else {
        let df = nf - 2.0;
        let std_err = ((1.0 - r_value * r_value) * syy / sxx / df).sqrt();
        let p_value = if (1.0 - r_value.abs()) <= f64::EPSILON {
            0.0
        } else {
            let t = r_value * (df / ((1.0 - r_value) * (1.0 + r_value))).sqrt();
            let dist = StudentsT::new(0.0, 1.0, df)
                .map_err(|e| HidroError::Statistics(e.to_string()))?;
            2.0 * dist.sf(t.abs())
        };
        (p_value, std_err)
    };

    Ok(LinearFit {
        slope,
        intercept,
        r_value,
        p_value,
        std_err,
    })
}

/// Fit a trend against the observation index `0..n`
pub fn index_trend(y: &[f64]) -> Result<LinearFit> {
    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    linregress(&x, y)
}
