//! EM optimizer for the semi-supervised Gaussian mixture objective.
//!
//! The solver alternates an E-step (responsibility estimation, labeled rows
//! pinned one-hot) and an M-step (beta-weighted parameter re-estimation) to
//! maximize
//!
//! ```text
//! J = beta     * sum_labeled   log( pi[c_i] * N(D_i | mu[c_i], sigma[c_i]) )
//!   + (1-beta) * sum_unlabeled log( sum_k pi[k] * N(D_i | mu[k], sigma[k]) )
//! ```
//!
//! until the relative objective change drops below the configured percentage
//! tolerance, the iteration cap is hit, or (when enabled) the objective
//! decreases and the previous iteration's responsibilities are restored.

use crate::config::SsGmmConfig;
use crate::covariance::ClassCovariance;
use crate::design::DesignMatrix;
use crate::errors::{SsGmmError, SsGmmResult};
use crate::initializer::estimate_class_gaussians;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;
use std::hash::Hash;

/// Why the EM loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Relative objective change fell to or below the tolerance.
    Converged,
    /// The objective decreased and early stopping was enabled; the returned
    /// responsibilities come from the previous iteration.
    EarlyStopped,
    /// The iteration cap was reached before convergence.
    MaxIterationsReached,
}

/// Result of one solve call.
#[derive(Debug, Clone)]
pub struct SsGmmFit<C> {
    /// Hard class assignment for each unlabeled row, in input order.
    pub predicted_labels: Vec<C>,
    /// `U x K` soft responsibilities for the unlabeled rows; rows sum to 1.
    pub responsibilities: DMatrix<f64>,
    /// Objective value before the first iteration plus one entry per
    /// iteration run.
    pub objective_trace: Vec<f64>,
    /// Why the loop stopped.
    pub termination: Termination,
    /// Number of EM iterations executed.
    pub iterations: usize,
    /// Final mixture weights, one per class, summing to 1.
    pub mixture_weights: Vec<f64>,
    /// Final class means as rows of a `K x (d+1)` matrix (bias column
    /// included).
    pub means: DMatrix<f64>,
    /// Class identifiers in the order used by `responsibilities` columns.
    pub classes: Vec<C>,
}

/// Mutable EM state for a single solve call.
///
/// Owns `pi`, `mu`, and the cached covariance algebra exclusively for the
/// duration of the call; the design-matrix rows and label positions are
/// read-only throughout.
struct EmState {
    beta: f64,
    n_labeled: usize,
    n_unlabeled: usize,
    num_classes: usize,
    dim: usize,
    /// Design-matrix rows as column vectors, labeled rows first.
    rows: Vec<DVector<f64>>,
    /// Class position per labeled row.
    label_positions: Vec<usize>,
    /// Rendered class identifiers for diagnostics, in class order.
    class_labels: Vec<String>,
    pi: Vec<f64>,
    mu: Vec<DVector<f64>>,
    covariances: Vec<ClassCovariance>,
}

impl EmState {
    fn initialize<C: Clone + Eq + Hash + Ord + Debug>(
        design: &DesignMatrix<C>,
        config: &SsGmmConfig,
    ) -> SsGmmResult<Self> {
        let n = design.n_rows();
        let dim = design.dim();
        let num_classes = design.classes.len();

        let rows: Vec<DVector<f64>> = (0..n)
            .map(|i| design.matrix.row(i).transpose())
            .collect();

        // Supervised starting point from the labeled block only
        let labeled_block = design.matrix.rows(0, design.n_labeled).into_owned();
        let init =
            estimate_class_gaussians(&labeled_block, &design.label_positions, num_classes)?;

        let mu: Vec<DVector<f64>> = (0..num_classes)
            .map(|k| init.means.row(k).transpose())
            .collect();
        let class_labels: Vec<String> = design
            .classes
            .labels()
            .iter()
            .map(|label| format!("{:?}", label))
            .collect();
        let covariances = init
            .covariances
            .into_iter()
            .enumerate()
            .map(|(k, sigma)| {
                ClassCovariance::new(sigma, config.cond_tolerance, &class_labels[k])
            })
            .collect::<SsGmmResult<Vec<_>>>()?;

        Ok(Self {
            beta: config.beta,
            n_labeled: design.n_labeled,
            n_unlabeled: design.n_unlabeled,
            num_classes,
            dim,
            rows,
            label_positions: design.label_positions.clone(),
            class_labels,
            pi: init.priors,
            mu,
            covariances,
        })
    }

    fn n_rows(&self) -> usize {
        self.n_labeled + self.n_unlabeled
    }

    /// Beta-weighted log-likelihood objective.
    ///
    /// The labeled term uses only the density of each point's true class;
    /// the unlabeled term marginalizes over all classes before the log.
    fn objective(&self) -> f64 {
        let mut labeled_sum = 0.0;
        for i in 0..self.n_labeled {
            let k = self.label_positions[i];
            labeled_sum +=
                (self.pi[k] * self.covariances[k].density(&self.rows[i], &self.mu[k])).ln();
        }

        let mut unlabeled_sum = 0.0;
        for i in self.n_labeled..self.n_rows() {
            let mut mixture = 0.0;
            for k in 0..self.num_classes {
                mixture += self.pi[k] * self.covariances[k].density(&self.rows[i], &self.mu[k]);
            }
            unlabeled_sum += mixture.ln();
        }

        self.beta * labeled_sum + (1.0 - self.beta) * unlabeled_sum
    }

    /// E-step: labeled rows are rewritten one-hot at their known class;
    /// unlabeled rows get normalized class-conditional responsibilities.
    ///
    /// Returns true if any unlabeled row had all class densities underflow
    /// to zero, in which case that row falls back to uniform
    /// responsibilities.
    fn e_step(&self, gamma: &mut DMatrix<f64>) -> bool {
        for i in 0..self.n_labeled {
            for k in 0..self.num_classes {
                gamma[(i, k)] = 0.0;
            }
            gamma[(i, self.label_positions[i])] = 1.0;
        }

        let mut underflowed = false;
        for i in self.n_labeled..self.n_rows() {
            let mut total = 0.0;
            for k in 0..self.num_classes {
                let r = self.pi[k] * self.covariances[k].density(&self.rows[i], &self.mu[k]);
                gamma[(i, k)] = r;
                total += r;
            }
            if total > 0.0 {
                for k in 0..self.num_classes {
                    gamma[(i, k)] /= total;
                }
            } else {
                // All class densities underflowed for this row; a uniform
                // row keeps the responsibility invariant intact
                let uniform = 1.0 / self.num_classes as f64;
                for k in 0..self.num_classes {
                    gamma[(i, k)] = uniform;
                }
                underflowed = true;
            }
        }
        underflowed
    }

    /// M-step: beta-weighted re-estimation of `pi`, `mu`, and `sigma` per
    /// class, with the covariance caches rebuilt immediately after each
    /// `sigma` update.
    ///
    /// Classes read only the previous iteration's responsibilities and their
    /// own freshly updated mean, so update order between classes does not
    /// affect the result.
    fn m_step(&mut self, gamma: &DMatrix<f64>, cond_tolerance: f64) -> SsGmmResult<()> {
        let beta = self.beta;
        let weight_total =
            beta * self.n_labeled as f64 + (1.0 - beta) * self.n_unlabeled as f64;

        for k in 0..self.num_classes {
            let mut nl = 0.0;
            for i in 0..self.n_labeled {
                nl += gamma[(i, k)];
            }
            let mut nu = 0.0;
            for i in self.n_labeled..self.n_rows() {
                nu += gamma[(i, k)];
            }
            let c = beta * nl + (1.0 - beta) * nu;
            // At beta = 0 a class whose unlabeled responsibilities all
            // underflow has no mass left to divide by
            if c <= 0.0 || c.is_nan() {
                return Err(SsGmmError::NumericalError {
                    reason: format!(
                        "class {} lost all responsibility mass",
                        self.class_labels[k]
                    ),
                    operation: Some("M-step re-estimation".to_string()),
                });
            }

            self.pi[k] = c / weight_total;

            let mut mean_labeled = DVector::zeros(self.dim);
            for i in 0..self.n_labeled {
                mean_labeled += gamma[(i, k)] * &self.rows[i];
            }
            let mut mean_unlabeled = DVector::zeros(self.dim);
            for i in self.n_labeled..self.n_rows() {
                mean_unlabeled += gamma[(i, k)] * &self.rows[i];
            }
            let mu_k = (beta * mean_labeled + (1.0 - beta) * mean_unlabeled) / c;

            // Covariance is centered on the newly updated mean
            let mut sigma_labeled = DMatrix::zeros(self.dim, self.dim);
            for i in 0..self.n_labeled {
                let diff = &self.rows[i] - &mu_k;
                sigma_labeled += gamma[(i, k)] * &diff * diff.transpose();
            }
            let mut sigma_unlabeled = DMatrix::zeros(self.dim, self.dim);
            for i in self.n_labeled..self.n_rows() {
                let diff = &self.rows[i] - &mu_k;
                sigma_unlabeled += gamma[(i, k)] * &diff * diff.transpose();
            }
            let sigma = (beta * sigma_labeled + (1.0 - beta) * sigma_unlabeled) / c;

            self.mu[k] = mu_k;
            self.covariances[k] =
                ClassCovariance::new(sigma, cond_tolerance, &self.class_labels[k])?;
        }

        Ok(())
    }
}

/// Fits a semi-supervised Gaussian mixture model.
///
/// `xtrain` is the `L x d` labeled feature matrix with labels `ytrain`;
/// `xtest` is the `U x d` unlabeled feature matrix sharing the same feature
/// space. The number of mixture components `K` is fixed by the distinct
/// labels observed in `ytrain`. Returns hard and soft assignments for every
/// unlabeled row along with the objective trace and final mixture
/// parameters.
///
/// # Errors
///
/// Input-contract violations (dimension mismatches, invalid
/// hyperparameters, non-finite features) are reported before any
/// computation. A covariance whose pseudo-inverse and plain inverse both
/// fail is fatal, as is a class losing all responsibility mass (possible at
/// `beta = 0`). Non-convergence within `max_iterations` is not an error.
pub fn fit_semi_supervised_gmm<C: Clone + Eq + Hash + Ord + Debug>(
    xtrain: &DMatrix<f64>,
    ytrain: &[C],
    xtest: &DMatrix<f64>,
    config: &SsGmmConfig,
) -> SsGmmResult<SsGmmFit<C>> {
    config.validate()?;
    let design = DesignMatrix::build(xtrain, ytrain, xtest)?;
    let mut state = EmState::initialize(&design, config)?;

    let n = state.n_rows();
    let k = state.num_classes;

    let mut objective_trace = vec![state.objective()];
    let mut gamma = DMatrix::zeros(n, k);
    let mut termination = Termination::Converged;
    let mut iterations = 0usize;
    let mut underflow_warned = false;

    loop {
        let gamma_previous = gamma.clone();

        if state.e_step(&mut gamma) && !underflow_warned {
            log::warn!(
                "all class densities underflowed for at least one unlabeled row; \
                 using uniform responsibilities for affected rows"
            );
            underflow_warned = true;
        }
        state.m_step(&gamma, config.cond_tolerance)?;

        objective_trace.push(state.objective());
        iterations += 1;
        let current = objective_trace[iterations];
        let previous = objective_trace[iterations - 1];
        log::debug!("EM iteration {}: objective = {}", iterations, current);

        if config.early_stop && previous - current > 0.0 {
            // Responsibilities roll back to the pre-decrease iteration;
            // pi/mu/sigma intentionally keep their newer values
            log::warn!(
                "objective decreased at iteration {}; stopping early with the \
                 previous iteration's responsibilities",
                iterations
            );
            gamma = gamma_previous;
            termination = Termination::EarlyStopped;
            break;
        }

        let obj_change = ((current - previous) / previous).abs() * 100.0;
        if obj_change <= config.tol {
            termination = Termination::Converged;
            break;
        }
        if iterations >= config.max_iterations {
            log::warn!(
                "maximum number of EM iterations ({}) reached before convergence",
                config.max_iterations
            );
            termination = Termination::MaxIterationsReached;
            break;
        }
    }

    // Hard assignments: first maximal responsibility wins ties, mapped back
    // to the original class identifiers
    let mut predicted_labels = Vec::with_capacity(state.n_unlabeled);
    for i in state.n_labeled..n {
        let mut best = 0;
        let mut best_value = gamma[(i, 0)];
        for j in 1..k {
            if gamma[(i, j)] > best_value {
                best_value = gamma[(i, j)];
                best = j;
            }
        }
        predicted_labels.push(design.classes.label(best).clone());
    }

    let responsibilities = gamma.rows(state.n_labeled, state.n_unlabeled).into_owned();
    let mut means = DMatrix::zeros(k, state.dim);
    for (row, mu_k) in state.mu.iter().enumerate() {
        for j in 0..state.dim {
            means[(row, j)] = mu_k[j];
        }
    }

    Ok(SsGmmFit {
        predicted_labels,
        responsibilities,
        objective_trace,
        termination,
        iterations,
        mixture_weights: state.pi,
        means,
        classes: design.classes.labels().to_vec(),
    })
}
