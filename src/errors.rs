//! Error types and input validation for the ssGMM solver.
//!
//! Every input-contract violation is reported before any computation starts;
//! numerical failures during the EM loop are either absorbed locally by the
//! covariance regularization or surfaced as a fatal [`SsGmmError::NumericalError`].

use thiserror::Error;

/// Error types for semi-supervised GMM fitting.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum SsGmmError {
    /// Insufficient data for the requested operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Invalid hyperparameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Mismatched matrix/vector dimensions between inputs.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: String,
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// A class in the labeled set has no members.
    #[error("Empty class: no labeled examples for class index {class_index}")]
    EmptyClass {
        /// Index of the class in label-sorted order
        class_index: usize,
    },

    /// Numerical computation failed beyond recovery.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for the failure
        reason: String,
        /// Operation that failed, if known
        operation: Option<String>,
    },
}

/// Result type for ssGMM operations.
pub type SsGmmResult<T> = Result<T, SsGmmError>;

/// Validates that a parameter is within expected bounds (inclusive).
///
/// NaN values and NaN/inverted bounds are rejected.
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> SsGmmResult<()> {
    if value.is_nan() {
        return Err(SsGmmError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(SsGmmError::NumericalError {
            reason: format!("Invalid bounds for parameter {}: min={}, max={}", name, min, max),
            operation: None,
        });
    }

    if value < min || value > max {
        Err(SsGmmError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value with its position.
pub fn validate_all_finite(data: &[f64], name: &str) -> SsGmmResult<()> {
    if let Some((i, &value)) = data.iter().enumerate().find(|(_, &v)| !v.is_finite()) {
        return Err(SsGmmError::NumericalError {
            reason: format!("{} contains non-finite value at index {}: {}", name, i, value),
            operation: None,
        });
    }
    Ok(())
}
