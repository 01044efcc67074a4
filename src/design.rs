//! Data preparation: class indexing and design-matrix assembly.
//!
//! Labeled and unlabeled feature matrices are merged once per solve into a
//! single design matrix with an appended bias column. Per-class state
//! everywhere else in the crate is stored in parallel containers indexed by
//! the integer position of the class in label-sorted order; the mapping from
//! class identifier to that integer lives here and is computed exactly once.

use crate::errors::{validate_all_finite, SsGmmError, SsGmmResult};
use nalgebra::DMatrix;
use std::collections::HashMap;
use std::hash::Hash;

/// Ordered set of unique class identifiers with reverse lookup.
///
/// Iteration order is ascending label order and is fixed for the lifetime of
/// a solve; all per-class arrays in the solver follow it.
#[derive(Debug, Clone)]
pub struct ClassIndex<C> {
    classes: Vec<C>,
    index: HashMap<C, usize>,
}

impl<C: Clone + Eq + Hash + Ord> ClassIndex<C> {
    /// Builds the sorted unique class set from observed labels.
    pub fn from_labels(labels: &[C]) -> SsGmmResult<Self> {
        if labels.is_empty() {
            return Err(SsGmmError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let mut classes: Vec<C> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        Ok(Self { classes, index })
    }

    /// Number of distinct classes `K`.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when no classes are present (unreachable after construction).
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Integer position of a class identifier, if it was observed.
    pub fn position(&self, label: &C) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Class identifier at a given position.
    pub fn label(&self, position: usize) -> &C {
        &self.classes[position]
    }

    /// All class identifiers in label-sorted order.
    pub fn labels(&self) -> &[C] {
        &self.classes
    }
}

/// Merged design matrix with bias column and labeled-row bookkeeping.
#[derive(Debug, Clone)]
pub struct DesignMatrix<C> {
    /// `n x (d+1)` matrix: labeled rows first, unlabeled rows after,
    /// final column constant 1.
    pub matrix: DMatrix<f64>,
    /// Class position (in [`ClassIndex`] order) for each labeled row.
    pub label_positions: Vec<usize>,
    /// Ordered class set observed in the labeled data.
    pub classes: ClassIndex<C>,
    /// Number of labeled rows `L`.
    pub n_labeled: usize,
    /// Number of unlabeled rows `U`.
    pub n_unlabeled: usize,
}

impl<C: Clone + Eq + Hash + Ord> DesignMatrix<C> {
    /// Assembles the design matrix from labeled and unlabeled features.
    ///
    /// Fails if the label count does not match the labeled row count, if the
    /// feature dimensionality differs between the two matrices, or if any
    /// feature value is non-finite. No other side effects.
    pub fn build(
        xtrain: &DMatrix<f64>,
        ytrain: &[C],
        xtest: &DMatrix<f64>,
    ) -> SsGmmResult<Self> {
        let n_labeled = xtrain.nrows();
        let n_unlabeled = xtest.nrows();
        let d = xtrain.ncols();

        if ytrain.len() != n_labeled {
            return Err(SsGmmError::DimensionMismatch {
                context: "label vector vs labeled feature rows".to_string(),
                expected: n_labeled,
                actual: ytrain.len(),
            });
        }
        if n_unlabeled > 0 && xtest.ncols() != d {
            return Err(SsGmmError::DimensionMismatch {
                context: "unlabeled vs labeled feature dimensionality".to_string(),
                expected: d,
                actual: xtest.ncols(),
            });
        }
        if d == 0 {
            return Err(SsGmmError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        validate_all_finite(xtrain.as_slice(), "labeled features")?;
        validate_all_finite(xtest.as_slice(), "unlabeled features")?;

        let classes = ClassIndex::from_labels(ytrain)?;
        let label_positions = ytrain
            .iter()
            .map(|y| {
                // from_labels covers every observed label
                classes.position(y).expect("label present in class index")
            })
            .collect();

        let n = n_labeled + n_unlabeled;
        let mut matrix = DMatrix::zeros(n, d + 1);
        for i in 0..n_labeled {
            for j in 0..d {
                matrix[(i, j)] = xtrain[(i, j)];
            }
            matrix[(i, d)] = 1.0;
        }
        for i in 0..n_unlabeled {
            for j in 0..d {
                matrix[(n_labeled + i, j)] = xtest[(i, j)];
            }
            matrix[(n_labeled + i, d)] = 1.0;
        }

        log::info!(
            "ssGMM design matrix: {} labeled, {} unlabeled, {} classes, {} features",
            n_labeled,
            n_unlabeled,
            classes.len(),
            d
        );

        Ok(Self {
            matrix,
            label_positions,
            classes,
            n_labeled,
            n_unlabeled,
        })
    }

    /// Total number of rows `n = L + U`.
    pub fn n_rows(&self) -> usize {
        self.n_labeled + self.n_unlabeled
    }

    /// Augmented dimensionality `d + 1` (features plus bias column).
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_index_sorted_and_deduplicated() {
        let labels = vec![3_i64, 1, 2, 1, 3, 3];
        let index = ClassIndex::from_labels(&labels).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.labels(), &[1, 2, 3]);
        assert_eq!(index.position(&2), Some(1));
        assert_eq!(index.position(&7), None);
        assert_eq!(*index.label(0), 1);
    }

    #[test]
    fn test_class_index_rejects_empty() {
        let labels: Vec<i64> = vec![];
        assert!(ClassIndex::from_labels(&labels).is_err());
    }

    #[test]
    fn test_design_matrix_layout() {
        let xtrain = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let xtest = DMatrix::from_row_slice(1, 2, &[5.0, 6.0]);
        let ytrain = vec![1_i64, 0];

        let design = DesignMatrix::build(&xtrain, &ytrain, &xtest).unwrap();
        assert_eq!(design.n_labeled, 2);
        assert_eq!(design.n_unlabeled, 1);
        assert_eq!(design.n_rows(), 3);
        assert_eq!(design.dim(), 3);

        // Labeled rows first, bias column last
        assert_eq!(design.matrix[(0, 0)], 1.0);
        assert_eq!(design.matrix[(0, 2)], 1.0);
        assert_eq!(design.matrix[(2, 0)], 5.0);
        assert_eq!(design.matrix[(2, 2)], 1.0);

        // Labels map into sorted class order: classes are [0, 1]
        assert_eq!(design.label_positions, vec![1, 0]);
    }

    #[test]
    fn test_design_matrix_label_count_mismatch() {
        let xtrain = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let xtest = DMatrix::from_row_slice(1, 2, &[5.0, 6.0]);
        let ytrain = vec![1_i64];

        let result = DesignMatrix::build(&xtrain, &ytrain, &xtest);
        assert!(matches!(
            result,
            Err(SsGmmError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_design_matrix_feature_dim_mismatch() {
        let xtrain = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let xtest = DMatrix::from_row_slice(1, 3, &[5.0, 6.0, 7.0]);
        let ytrain = vec![1_i64, 0];

        let result = DesignMatrix::build(&xtrain, &ytrain, &xtest);
        assert!(matches!(result, Err(SsGmmError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_design_matrix_rejects_non_finite() {
        let xtrain = DMatrix::from_row_slice(2, 2, &[1.0, f64::NAN, 3.0, 4.0]);
        let xtest = DMatrix::from_row_slice(1, 2, &[5.0, 6.0]);
        let ytrain = vec![1_i64, 0];

        assert!(DesignMatrix::build(&xtrain, &ytrain, &xtest).is_err());
    }

    #[test]
    fn test_design_matrix_no_unlabeled_rows() {
        let xtrain = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let xtest = DMatrix::zeros(0, 1);
        let ytrain = vec![0_i64, 1];

        let design = DesignMatrix::build(&xtrain, &ytrain, &xtest).unwrap();
        assert_eq!(design.n_unlabeled, 0);
        assert_eq!(design.n_rows(), 2);
    }
}
