//! Prediction error metrics

use crate::errors::{HidroError, Result};
use serde::Serialize;

/// Error metrics of one prediction set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl ErrorMetrics {
    pub fn compute(observed: &[f64], predicted: &[f64]) -> Result<Self> {
        Ok(Self {
            mae: mae(observed, predicted)?,
            rmse: rmse(observed, predicted)?,
            r2: r2_score(observed, predicted)?,
        })
    }
}

fn check(observed: &[f64], predicted: &[f64]) -> Result<()> {
    if observed.len() != predicted.len() {
        return Err(HidroError::Statistics(format!(
            "observed and predicted lengths differ: {} vs {}",
            observed.len(),
            predicted.len()
        )));
    }
    if observed.is_empty() {
        return Err(HidroError::insufficient("error metrics", 1, 0));
    }
    Ok(())
}

/// Mean absolute error
pub fn mae(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    check(observed, predicted)?;
    let total: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).abs()).sum();
    Ok(total / observed.len() as f64)
}

/// Root mean squared error
pub fn rmse(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    check(observed, predicted)?;
    let total: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).powi(2)).sum();
    Ok((total / observed.len() as f64).sqrt())
}

/// Coefficient of determination, `1 - SS_res / SS_tot`. A constant
/// observation vector scores 1 for a perfect prediction and 0 otherwise.
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    check(observed, predicted)?;
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let ss_res: f64 = observed.iter().zip(predicted).map(|(o, p)| (o - p).powi(2)).sum();
    let ss_tot: f64 = observed.iter().map(|o| (o - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}
