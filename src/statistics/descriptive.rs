//! Descriptive statistics over a sample

use super::operations::{StatOperation, StatisticalReduction};
use crate::errors::{HidroError, Result};
use serde::Serialize;

/// Summary of a sample, as reported in the comparison tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `NaN` for a single value
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
}

impl Summary {
    /// Summarize `values`, ignoring non-finite entries
    ///
    /// # Errors
    ///
    /// Returns [`HidroError::InsufficientData`] if no finite value remains.
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return Err(HidroError::insufficient("summary", 1, 0));
        }
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            count: sorted.len(),
            mean: sorted.try_reduce(StatOperation::Mean)?,
            median: quantile(&sorted, 0.5),
            std: sorted.reduce(StatOperation::Std).unwrap_or(f64::NAN),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
        })
    }

    /// Coefficient of variation in percent (std / mean × 100)
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            f64::NAN
        } else {
            self.std / self.mean * 100.0
        }
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Quantile of an ascending sample using linear interpolation between
/// closest ranks. `sorted` must be non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let q = q.clamp(0.0, 1.0);
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin `values` into `bins` equal-width bins spanning their range. The
    /// last bin is closed on the right so the maximum is counted.
    pub fn new(values: &[f64], bins: usize) -> Result<Self> {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let min = finite
            .reduce(StatOperation::Min)
            .ok_or_else(|| HidroError::insufficient("histogram", 1, 0))?;
        let max = finite.reduce(StatOperation::Max).unwrap_or(min);
        let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, min + 0.5) };
        let width = (hi - lo) / bins as f64;

        let edges = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0; bins];
        for v in finite {
            let index = (((v - lo) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }
        Ok(Self { edges, counts })
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
