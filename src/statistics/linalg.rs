//! Small dense linear algebra on ndarray
//!
//! The systems solved here are normal equations with a handful of
//! regressors, so plain Gaussian elimination with partial pivoting is
//! enough.

use crate::errors::{HidroError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Pivots below this magnitude are treated as zero
const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a · x = b` for square `a`
///
/// # Errors
///
/// Returns [`HidroError::SingularMatrix`] if `a` is not square, does not
/// match `b`, or is numerically singular.
pub fn solve(a: ArrayView2<f64>, b: ArrayView1<f64>) -> Result<Array1<f64>> {
    let rhs = b.to_owned().insert_axis(Axis(1));
    let x = solve_many(a, rhs.view())?;
    Ok(x.index_axis(Axis(1), 0).to_owned())
}

/// Inverse of a square matrix
pub fn invert(a: ArrayView2<f64>) -> Result<Array2<f64>> {
    let identity = Array2::<f64>::eye(a.nrows());
    solve_many(a, identity.view())
}

/// Solve `a · X = B` for every column of `B`
pub fn solve_many(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.nrows() != n {
        return Err(HidroError::SingularMatrix(format!(
            "shape mismatch: a is {}x{}, b has {} rows",
            n,
            a.ncols(),
            b.nrows()
        )));
    }

    let mut m = a.to_owned();
    let mut x = b.to_owned();
    let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| m[[i, col]].abs().total_cmp(&m[[j, col]].abs()))
            .unwrap_or(col);
        if m[[pivot_row, col]].abs() <= PIVOT_EPSILON * scale {
            return Err(HidroError::SingularMatrix(format!(
                "zero pivot in column {col}"
            )));
        }
        if pivot_row != col {
            swap_rows(&mut m, pivot_row, col);
            swap_rows(&mut x, pivot_row, col);
        }

        let pivot = m[[col, col]];
        for row in (col + 1)..n {
            let factor = m[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[[row, k]] -= factor * m[[col, k]];
            }
            for k in 0..x.ncols() {
                x[[row, k]] -= factor * x[[col, k]];
            }
        }
    }

    for col in (0..n).rev() {
        let pivot = m[[col, col]];
        for k in 0..x.ncols() {
            let mut acc = x[[col, k]];
            for j in (col + 1)..n {
                acc -= m[[col, j]] * x[[j, k]];
            }
            x[[col, k]] = acc / pivot;
        }
    }

    Ok(x)
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    for k in 0..m.ncols() {
        m.swap([a, k], [b, k]);
    }
}

/// Ordinary least squares fit of `y` on the columns of `x`
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Array1<f64>,
    pub std_errors: Array1<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    pub nobs: usize,
}

impl OlsFit {
    /// t statistic of coefficient `i`
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Akaike information criterion of the Gaussian likelihood
    pub fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let k = self.coefficients.len() as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * k
    }
}

/// Fit `y = x · β` by least squares via the normal equations
pub fn ols(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<OlsFit> {
    let (n, k) = x.dim();
    if n != y.len() {
        return Err(HidroError::Statistics(format!(
            "design has {n} rows but response has {}",
            y.len()
        )));
    }
    if n <= k {
        return Err(HidroError::insufficient("least squares", k + 1, n));
    }

    let xtx = x.t().dot(&x);
    let xty = x.t().dot(&y);
    let xtx_inv = invert(xtx.view())?;
    let coefficients = xtx_inv.dot(&xty);

    let residuals = &y - &x.dot(&coefficients);
    let ssr = residuals.dot(&residuals);
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = xtx_inv.diag().mapv(|v| (v * sigma2).max(0.0).sqrt());

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
    })
}
