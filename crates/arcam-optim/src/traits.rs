use arcam_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic non-linear least squares problem with dense parameter/residual vectors.
///
/// Backends update the parameters additively, so problems with rotations
/// must parameterize them locally (see [`crate::problems::AnchoredPose`]).
pub trait NllsProblem {
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    /// Residuals at `x`. Non-finite entries mark an unusable point.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real>;
}

/// Stopping policy.
///
/// The solver stops once the relative change of the parameters drops below
/// `tolerance`, or once `max_iters` iterations pass without meeting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Iteration budget. One iteration allows `n + 1` residual evaluations
    /// for `n` parameters.
    pub max_iters: usize,
    /// Relative tolerance on the parameter update.
    pub tolerance: Real,
    /// Reciprocal condition number of the scaled normal matrix below which
    /// the problem is reported as degenerate.
    pub rcond_threshold: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 30,
            tolerance: 1e-3,
            rcond_threshold: 1e-13,
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The relative update fell below the tolerance, or no further
    /// improvement is possible at machine precision.
    Converged,
    /// The iteration budget ran out first.
    MaxIterations,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Residual evaluations spent by the solver.
    pub iterations: usize,
    /// `½ ‖r‖²` at the start point.
    pub initial_cost: Real,
    /// `½ ‖r‖²` at the returned point.
    pub final_cost: Real,
    pub termination: Termination,
    /// Reciprocal condition number of the scaled normal matrix at the solution.
    pub rcond: Real,
}

impl SolveReport {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SolveError {
    #[error("normal equations are rank deficient at iteration {iteration} (rcond={rcond:e})")]
    Degenerate { iteration: usize, rcond: Real },
    #[error("numerical failure at iteration {iteration} (cost={cost})")]
    NumericalFailure { iteration: usize, cost: Real },
    #[error("problem dimensions do not match: {params} parameters, {residuals} residuals, x has {x_len}")]
    DimensionMismatch {
        params: usize,
        residuals: usize,
        x_len: usize,
    },
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> Result<(DVector<Real>, SolveReport), SolveError>;
}
