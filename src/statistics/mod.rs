//! Statistical computations
//!
//! # Organization
//!
//! - [`operations`]: bucket reductions used by the aggregation layer
//! - [`descriptive`]: sample summaries, quantiles and histograms
//! - [`regression`]: least-squares trend lines with significance
//! - [`linalg`]: dense solves and ordinary least squares on ndarray
//! - [`glm`]: Gamma and Gaussian GLMs fitted by IRLS
//! - [`timeseries`]: ACF/PACF and the augmented Dickey-Fuller test
//! - [`metrics`]: prediction error metrics

pub mod descriptive;
pub mod glm;
pub mod linalg;
pub mod metrics;
pub mod operations;
pub mod regression;
pub mod timeseries;

// Re-export the main types and functions for convenience
pub use descriptive::{Histogram, Summary};
pub use glm::{Family, GlmFit, GlmOptions};
pub use metrics::ErrorMetrics;
pub use operations::{StatOperation, StatisticalReduction};
pub use regression::{index_trend, linregress, LinearFit};
pub use timeseries::{acf, adf_test, pacf_yule_walker, AdfResult};
