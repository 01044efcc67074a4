//! Configuration for the semi-supervised GMM solver.

use crate::errors::{validate_parameter, SsGmmError, SsGmmResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Hyperparameters controlling one solve call.
///
/// `beta` weights the labeled against the unlabeled log-likelihood in the
/// objective and in every M-step update. The documented intent is
/// `0 < beta < 1`; the degenerate endpoints 0 (fully unsupervised) and
/// 1 (fully supervised) are mathematically well-defined and accepted. At
/// `beta = 0` a class can lose all responsibility mass mid-solve; the
/// solver reports that as a numerical error instead of dividing by zero.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SsGmmConfig {
    /// Labeled/unlabeled trade-off in `[0, 1]`.
    pub beta: f64,
    /// Convergence tolerance as a percentage of relative objective change.
    /// `tol = 1.0` stops once the objective changes by at most 1%.
    pub tol: f64,
    /// Hard cap on EM iterations.
    pub max_iterations: usize,
    /// Stop as soon as the objective decreases, returning the previous
    /// iteration's responsibilities.
    pub early_stop: bool,
    /// Cutoff for singular values in the covariance pseudo-inverse and
    /// pseudo-determinant.
    pub cond_tolerance: f64,
}

impl Default for SsGmmConfig {
    fn default() -> Self {
        Self {
            beta: 0.5,
            tol: 0.01,
            max_iterations: 100,
            early_stop: false,
            cond_tolerance: 1e-15,
        }
    }
}

impl SsGmmConfig {
    /// Checks all hyperparameters before any computation runs.
    pub fn validate(&self) -> SsGmmResult<()> {
        validate_parameter(self.beta, 0.0, 1.0, "beta")?;

        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(SsGmmError::InvalidParameter {
                parameter: "tol".to_string(),
                value: self.tol,
                constraint: "must be a positive percentage".to_string(),
            });
        }

        if self.max_iterations == 0 {
            return Err(SsGmmError::InvalidParameter {
                parameter: "max_iterations".to_string(),
                value: 0.0,
                constraint: "must be at least 1".to_string(),
            });
        }

        if !self.cond_tolerance.is_finite() || self.cond_tolerance <= 0.0 {
            return Err(SsGmmError::InvalidParameter {
                parameter: "cond_tolerance".to_string(),
                value: self.cond_tolerance,
                constraint: "must be a positive singular-value cutoff".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SsGmmConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.beta, 0.5);
        assert_eq!(config.max_iterations, 100);
        assert!(!config.early_stop);
    }

    #[test]
    fn test_degenerate_beta_accepted() {
        let mut config = SsGmmConfig::default();
        config.beta = 0.0;
        assert!(config.validate().is_ok());
        config.beta = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_beta_rejected() {
        let mut config = SsGmmConfig::default();
        config.beta = 1.2;
        assert!(matches!(
            config.validate(),
            Err(SsGmmError::InvalidParameter { .. })
        ));
        config.beta = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_tol_rejected() {
        let mut config = SsGmmConfig::default();
        config.tol = 0.0;
        assert!(config.validate().is_err());
        config.tol = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = SsGmmConfig::default();
        config.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_cond_tolerance_rejected() {
        let mut config = SsGmmConfig::default();
        config.cond_tolerance = -1e-15;
        assert!(config.validate().is_err());
    }
}
