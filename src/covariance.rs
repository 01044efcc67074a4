//! Covariance regularization and multivariate Gaussian density evaluation.
//!
//! With few labeled examples per class the covariance estimates are often
//! rank-deficient, and the true inverse/determinant would collapse the
//! objective to negative infinity. Each class covariance is therefore wrapped
//! with an SVD-based pseudo-inverse and pseudo-determinant, recomputed
//! immediately after every M-step update so stale values are never read. The
//! density evaluator reuses these cached quantities instead of re-decomposing
//! the matrix on every call.

use crate::errors::{SsGmmError, SsGmmResult};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::TAU;

/// A class covariance with its cached pseudo-inverse and pseudo-determinant.
#[derive(Debug, Clone)]
pub struct ClassCovariance {
    /// The covariance matrix itself, `dim x dim`, symmetric by construction.
    pub sigma: DMatrix<f64>,
    /// Moore-Penrose pseudo-inverse of `sigma`.
    pseudo_inverse: DMatrix<f64>,
    /// Product of the singular values above the cutoff.
    pseudo_determinant: f64,
}

impl ClassCovariance {
    /// Wraps a candidate covariance, computing its regularized algebra.
    ///
    /// Singular values at or below `cond_tolerance` are treated as zero: the
    /// pseudo-determinant is the product of the remaining ones and the
    /// pseudo-inverse is the standard Moore-Penrose construction with the
    /// same cutoff. If the pseudo-inverse computation reports failure, the
    /// plain inverse is tried once with a diagnostic naming the class by its
    /// identifier; any further failure is fatal.
    pub fn new(
        sigma: DMatrix<f64>,
        cond_tolerance: f64,
        class_label: &str,
    ) -> SsGmmResult<Self> {
        let svd = sigma.clone().svd(false, false);
        let rank = svd
            .singular_values
            .iter()
            .filter(|&&s| s > cond_tolerance)
            .count();
        // Singular values come back in descending order; an all-zero matrix
        // has rank 0 and an empty product, i.e. pseudo-determinant 1
        let pseudo_determinant: f64 = svd.singular_values.iter().take(rank).product();

        let pseudo_inverse = match sigma.clone().pseudo_inverse(cond_tolerance) {
            Ok(pinv) => pinv,
            Err(reason) => {
                log::warn!(
                    "pseudo-inverse failed for class {} covariance ({}); falling back to plain inverse",
                    class_label,
                    reason
                );
                sigma.clone().try_inverse().ok_or_else(|| {
                    SsGmmError::NumericalError {
                        reason: format!(
                            "covariance for class {} is singular and the plain inverse also failed",
                            class_label
                        ),
                        operation: Some("covariance inversion".to_string()),
                    }
                })?
            }
        };

        Ok(Self {
            sigma,
            pseudo_inverse,
            pseudo_determinant,
        })
    }

    /// Pseudo-determinant of the wrapped covariance.
    pub fn pseudo_determinant(&self) -> f64 {
        self.pseudo_determinant
    }

    /// Multivariate Gaussian density at `x` for mean `mu`.
    ///
    /// Uses the cached pseudo-inverse and pseudo-determinant; for a
    /// well-conditioned covariance this is numerically identical to direct
    /// evaluation, just without the repeated decomposition.
    pub fn density(&self, x: &DVector<f64>, mu: &DVector<f64>) -> f64 {
        let dim = self.sigma.nrows() as i32;
        let diff = x - mu;
        let mahalanobis = (diff.transpose() * &self.pseudo_inverse * &diff)[(0, 0)];
        let normalizer = (TAU.powi(dim) * self.pseudo_determinant).sqrt();
        (1.0 / normalizer) * (-0.5 * mahalanobis).exp()
    }
}
