//! Core reduction operations
//!
//! This module defines the reductions applied to the daily values of one
//! aggregation bucket (a month, a pentad, a year).

use crate::errors::{HidroError, Result};

/// Supported reductions over a bucket of values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatOperation {
    /// Sum of values
    Sum,
    /// Number of values
    Count,
    /// Arithmetic mean
    Mean,
    /// Sample standard deviation (n - 1 denominator)
    Std,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
}

impl StatOperation {
    /// Get the string representation of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Count => "count",
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Min => "minimum",
            Self::Max => "maximum",
        }
    }

    /// Smallest bucket size for which the operation is defined
    #[must_use]
    pub const fn min_len(self) -> usize {
        match self {
            Self::Sum | Self::Count => 0,
            Self::Mean | Self::Min | Self::Max => 1,
            Self::Std => 2,
        }
    }
}

/// Trait for value buckets that can be reduced to a single number
pub trait StatisticalReduction {
    /// Apply `operation`, returning `None` when the bucket is too small
    /// for it (e.g. the standard deviation of a single value).
    fn reduce(&self, operation: StatOperation) -> Option<f64>;

    /// Like [`StatisticalReduction::reduce`] but reports the undefined case
    /// as an error
    ///
    /// # Errors
    ///
    /// Returns [`HidroError::InsufficientData`] when the bucket is smaller
    /// than [`StatOperation::min_len`].
    fn try_reduce(&self, operation: StatOperation) -> Result<f64>;
}

impl StatisticalReduction for [f64] {
    fn reduce(&self, operation: StatOperation) -> Option<f64> {
        if self.len() < operation.min_len() {
            return None;
        }
        let n = self.len() as f64;
        let value = match operation {
            StatOperation::Sum => self.iter().sum(),
            StatOperation::Count => n,
            StatOperation::Mean => self.iter().sum::<f64>() / n,
            StatOperation::Std => {
                let mean = self.iter().sum::<f64>() / n;
                let ss: f64 = self.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (n - 1.0)).sqrt()
            }
            StatOperation::Min => self.iter().copied().fold(f64::INFINITY, f64::min),
            StatOperation::Max => self.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        Some(value)
    }

    fn try_reduce(&self, operation: StatOperation) -> Result<f64> {
        self.reduce(operation).ok_or_else(|| {
            HidroError::insufficient(operation.as_str(), operation.min_len(), self.len())
        })
    }
}

impl StatisticalReduction for Vec<f64> {
    fn reduce(&self, operation: StatOperation) -> Option<f64> {
        self.as_slice().reduce(operation)
    }

    fn try_reduce(&self, operation: StatOperation) -> Result<f64> {
        self.as_slice().try_reduce(operation)
    }
}
