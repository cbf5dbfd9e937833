//! Non-linear least-squares refinement for `arcam`.
//!
//! - [`traits`]: problem / backend abstraction and solver options,
//! - [`backend_lm`]: Levenberg-Marquardt via the `levenberg-marquardt` crate,
//! - [`conditioning`]: rank check on the normal equations,
//! - [`factors`]: analytic reprojection residuals and Jacobians,
//! - [`problems`]: joint calibration and single-pose problems.

pub mod backend_lm;
pub mod conditioning;
pub mod factors;
pub mod problems;
pub mod traits;

pub use backend_lm::LmBackend;
pub use traits::{NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport, Termination};
