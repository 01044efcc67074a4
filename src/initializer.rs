//! Supervised initializer for the EM optimizer.
//!
//! A Bayes-style estimator computes starting priors, means, and covariances
//! from the labeled subset only. Despite the naive-Bayes heritage, every class
//! gets a full, unconstrained covariance matrix; no feature-independence
//! assumption is made. Covariances divide by the class count (not count minus
//! one), matching the EM M-step normalization.

use crate::errors::{SsGmmError, SsGmmResult};
use nalgebra::{DMatrix, DVector};

/// Per-class Gaussian estimates from labeled data.
#[derive(Debug, Clone)]
pub struct ClassGaussians {
    /// Class priors, one per class, summing to 1.
    pub priors: Vec<f64>,
    /// Class means as rows of a `K x dim` matrix.
    pub means: DMatrix<f64>,
    /// One full `dim x dim` covariance per class.
    pub covariances: Vec<DMatrix<f64>>,
}

/// Estimates priors, means, and full covariances per class.
///
/// `x` holds one example per row; `label_positions[i]` is the class position
/// of row `i` in label-sorted order; `num_classes` is `K`. Fails with
/// [`SsGmmError::EmptyClass`] if any class position in `0..K` has no members.
pub fn estimate_class_gaussians(
    x: &DMatrix<f64>,
    label_positions: &[usize],
    num_classes: usize,
) -> SsGmmResult<ClassGaussians> {
    let n = x.nrows();
    let dim = x.ncols();

    if label_positions.len() != n {
        return Err(SsGmmError::DimensionMismatch {
            context: "label positions vs feature rows".to_string(),
            expected: n,
            actual: label_positions.len(),
        });
    }
    if n == 0 {
        return Err(SsGmmError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let mut counts = vec![0usize; num_classes];
    for &pos in label_positions {
        counts[pos] += 1;
    }
    if let Some(empty) = counts.iter().position(|&c| c == 0) {
        return Err(SsGmmError::EmptyClass { class_index: empty });
    }

    let priors: Vec<f64> = counts.iter().map(|&c| c as f64 / n as f64).collect();

    // Class means: accumulate rows, then divide by counts
    let mut means = DMatrix::zeros(num_classes, dim);
    for (i, &pos) in label_positions.iter().enumerate() {
        for j in 0..dim {
            means[(pos, j)] += x[(i, j)];
        }
    }
    for k in 0..num_classes {
        for j in 0..dim {
            means[(k, j)] /= counts[k] as f64;
        }
    }

    // Outer-product covariances of centered rows, divide-by-count
    let mut covariances: Vec<DMatrix<f64>> =
        (0..num_classes).map(|_| DMatrix::zeros(dim, dim)).collect();
    for (i, &pos) in label_positions.iter().enumerate() {
        let centered: DVector<f64> =
            DVector::from_fn(dim, |j, _| x[(i, j)] - means[(pos, j)]);
        covariances[pos] += &centered * centered.transpose();
    }
    for (k, sigma) in covariances.iter_mut().enumerate() {
        *sigma /= counts[k] as f64;
    }

    Ok(ClassGaussians {
        priors,
        means,
        covariances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_priors_and_means() {
        // Two classes, 3:1 split
        let x = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 2.0, 0.0, 4.0, 0.0, 10.0, 10.0]);
        let positions = vec![0, 0, 0, 1];

        let est = estimate_class_gaussians(&x, &positions, 2).unwrap();
        assert_approx_eq!(est.priors[0], 0.75);
        assert_approx_eq!(est.priors[1], 0.25);
        assert_approx_eq!(est.priors.iter().sum::<f64>(), 1.0);

        assert_approx_eq!(est.means[(0, 0)], 2.0);
        assert_approx_eq!(est.means[(0, 1)], 0.0);
        assert_approx_eq!(est.means[(1, 0)], 10.0);
        assert_approx_eq!(est.means[(1, 1)], 10.0);
    }

    #[test]
    fn test_covariance_divides_by_count() {
        // One class, values 0 and 2 in the first coordinate: population
        // variance is 1.0 (divide by n, not n-1)
        let x = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 1.0]);
        let positions = vec![0, 0];

        let est = estimate_class_gaussians(&x, &positions, 1).unwrap();
        assert_approx_eq!(est.covariances[0][(0, 0)], 1.0);
        assert_approx_eq!(est.covariances[0][(0, 1)], 0.0);
        assert_approx_eq!(est.covariances[0][(1, 1)], 0.0);
    }

    #[test]
    fn test_covariance_is_symmetric() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 3.0, 5.0, 4.0, 1.0]);
        let positions = vec![0, 0, 0];

        let est = estimate_class_gaussians(&x, &positions, 1).unwrap();
        let sigma = &est.covariances[0];
        assert_approx_eq!(sigma[(0, 1)], sigma[(1, 0)]);
    }

    #[test]
    fn test_singleton_class_has_zero_covariance() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 5.0, 6.0]);
        let positions = vec![0, 1];

        let est = estimate_class_gaussians(&x, &positions, 2).unwrap();
        for sigma in &est.covariances {
            for v in sigma.iter() {
                assert_approx_eq!(*v, 0.0);
            }
        }
    }

    #[test]
    fn test_empty_class_rejected() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let positions = vec![0, 0];

        let result = estimate_class_gaussians(&x, &positions, 2);
        assert!(matches!(
            result,
            Err(SsGmmError::EmptyClass { class_index: 1 })
        ));
    }
}
