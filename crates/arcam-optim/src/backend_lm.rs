//! Levenberg-Marquardt backend built on the `levenberg-marquardt` crate.
//!
//! The crate owns damping and step acceptance. This wrapper adds the rank
//! check on the normal equations before and after the solve and maps the
//! crate's termination reasons onto [`Termination`].

use crate::conditioning::scaled_rcond;
use crate::traits::{
    NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport, Termination,
};
use arcam_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

/// Residual reported for a point the problem could not evaluate. Large
/// enough that any step producing it is rejected.
const INVALID_RESIDUAL: Real = 1e8;

struct LmWrapper<'a, P: NllsProblem> {
    problem: &'a P,
    params: DVector<Real>,
}

impl<P: NllsProblem> LeastSquaresProblem<Real, Dyn, Dyn> for LmWrapper<'_, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.params.clone_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let r = self.problem.residuals(&self.params);
        Some(r.map(|v| if v.is_finite() { v } else { INVALID_RESIDUAL }))
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let j = self.problem.jacobian(&self.params);
        j.iter().all(|v| v.is_finite()).then_some(j)
    }
}

fn cost_at<P: NllsProblem>(problem: &P, x: &DVector<Real>) -> Real {
    0.5 * problem.residuals(x).norm_squared()
}

fn normal_rcond<P: NllsProblem>(problem: &P, x: &DVector<Real>) -> Real {
    let jac = problem.jacobian(x);
    scaled_rcond(&(jac.transpose() * &jac))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LmBackend;

impl NllsSolverBackend for LmBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> Result<(DVector<Real>, SolveReport), SolveError> {
        let n = problem.num_params();
        if x0.len() != n || problem.num_residuals() < n {
            return Err(SolveError::DimensionMismatch {
                params: n,
                residuals: problem.num_residuals(),
                x_len: x0.len(),
            });
        }

        let initial_cost = cost_at(problem, &x0);
        if !initial_cost.is_finite() {
            return Err(SolveError::NumericalFailure {
                iteration: 0,
                cost: initial_cost,
            });
        }
        let rcond = normal_rcond(problem, &x0);
        if rcond < opts.rcond_threshold {
            return Err(SolveError::Degenerate { iteration: 0, rcond });
        }

        let wrapper = LmWrapper {
            problem,
            params: x0,
        };
        let lm = LevenbergMarquardt::new()
            .with_xtol(opts.tolerance)
            .with_ftol(0.0)
            .with_patience(opts.max_iters.max(1));
        let (wrapper, report) = lm.minimize(wrapper);
        let iterations = report.number_of_evaluations;
        let x = wrapper.params;

        let termination = if report.termination.was_successful() {
            Termination::Converged
        } else {
            match report.termination {
                TerminationReason::LostPatience => Termination::MaxIterations,
                TerminationReason::User(_) | TerminationReason::Numerical(_) => {
                    return Err(SolveError::NumericalFailure {
                        iteration: iterations,
                        cost: report.objective_function,
                    });
                }
                // remaining reasons: no step can improve at machine precision
                _ => Termination::Converged,
            }
        };

        let final_cost = cost_at(problem, &x);
        if !final_cost.is_finite() {
            return Err(SolveError::NumericalFailure {
                iteration: iterations,
                cost: final_cost,
            });
        }
        let rcond = normal_rcond(problem, &x);
        if rcond < opts.rcond_threshold {
            return Err(SolveError::Degenerate {
                iteration: iterations,
                rcond,
            });
        }

        debug!(
            "lm finished: {termination:?} ({:?}) after {iterations} evaluations, cost {initial_cost:.6e} -> {final_cost:.6e}, rcond {rcond:.3e}",
            report.termination
        );
        Ok((
            x,
            SolveReport {
                iterations,
                initial_cost,
                final_cost,
                termination,
                rcond,
            },
        ))
    }
}
