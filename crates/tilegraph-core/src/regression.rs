//! # Ordinary Least Squares
//!
//! Goodness of fit of `y ~ 1 + x1 + x2`.
//!
//! The fitted values are the orthogonal projection of `y` onto the column
//! space of the design matrix, built with modified Gram-Schmidt (two passes
//! per column). Columns that are numerically dependent on earlier ones are
//! dropped, so collinear predictors give the same fit a minimum-norm
//! least-squares solve would.

use crate::primitives::RANK_TOLERANCE;
use thiserror::Error;

/// Why a regression produced no usable R².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegressionError {
    /// Target and predictors differ in length.
    #[error("length mismatch: {target} targets, {predictors} predictor rows")]
    LengthMismatch { target: usize, predictors: usize },

    /// The computation produced NaN or infinity.
    #[error("non-finite regression result")]
    NonFinite,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// R² of the OLS fit of `y` on `x1`, `x2` and an intercept, clamped to `[-1, 1]`.
///
/// Returns `Ok(0.0)` when the total sum of squares is not positive.
pub fn ols_r2(y: &[f64], x1: &[f64], x2: &[f64]) -> Result<f64, RegressionError> {
    let n = y.len();
    if x1.len() != n || x2.len() != n {
        return Err(RegressionError::LengthMismatch {
            target: n,
            predictors: x1.len().min(x2.len()),
        });
    }
    if n == 0 {
        return Ok(0.0);
    }

    let mean = y.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if !ss_tot.is_finite() {
        return Err(RegressionError::NonFinite);
    }
    if ss_tot <= 0.0 {
        return Ok(0.0);
    }

    let design = [vec![1.0; n], x1.to_vec(), x2.to_vec()];
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(design.len());
    for column in design {
        let scale = dot(&column, &column).sqrt();
        if !scale.is_finite() {
            return Err(RegressionError::NonFinite);
        }
        let mut v = column;
        for _ in 0..2 {
            for q in &basis {
                let c = dot(q, &v);
                v.iter_mut().zip(q).for_each(|(vi, qi)| *vi -= c * qi);
            }
        }
        let norm = dot(&v, &v).sqrt();
        if norm > scale * RANK_TOLERANCE {
            v.iter_mut().for_each(|vi| *vi /= norm);
            basis.push(v);
        }
    }

    let mut residual = y.to_vec();
    for q in &basis {
        let c = dot(q, &residual);
        residual.iter_mut().zip(q).for_each(|(ri, qi)| *ri -= c * qi);
    }
    let ss_res = dot(&residual, &residual);

    let r2 = 1.0 - ss_res / ss_tot;
    if !r2.is_finite() {
        return Err(RegressionError::NonFinite);
    }
    Ok(r2.clamp(-1.0, 1.0))
}

// =============================================================================
// TESTS
// =============================================================================
