//! Per-frame pose estimation with a calibrated camera.

use arcam_core::{reprojection_stats, ObservationSet, PinholeCamera, Pose, Pt2, Real};
use arcam_linear::{initial_pose, PoseInitError};
use arcam_optim::problems::refine_pose;
use arcam_optim::{LmBackend, SolveError, SolveOptions, Termination};
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Correspondences required for a pose.
pub const MIN_CORRESPONDENCES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseOptions {
    pub solve: SolveOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PoseError {
    #[error("need at least 4 correspondences, got {found}")]
    InsufficientCorrespondences { found: usize },
    #[error("correspondence {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },
    #[error("target points are collinear")]
    Collinear,
    #[error("initial pose failed: {0}")]
    Initialization(PoseInitError),
    #[error("pose is degenerate (rcond={rcond:e})")]
    Degenerate { rcond: Real },
    #[error("pose did not converge after {iterations} iterations (rms={rms:.4} px)")]
    NotConverged { iterations: usize, rms: Real },
}

impl From<PoseInitError> for PoseError {
    fn from(err: PoseInitError) -> Self {
        match err {
            PoseInitError::NotEnoughPoints(found) => Self::InsufficientCorrespondences { found },
            PoseInitError::Collinear => Self::Collinear,
            other => Self::Initialization(other),
        }
    }
}

/// Refined pose with its fit quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSolution {
    pub pose: Pose,
    /// RMS pixel reprojection error.
    pub rms: Real,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoseEstimator {
    options: PoseOptions,
}

impl PoseEstimator {
    pub fn new(options: PoseOptions) -> Self {
        Self { options }
    }

    /// Solve the 6-DoF pose of the target seen in `correspondences`.
    ///
    /// A closed-form estimate (homography for coplanar targets, DLT
    /// otherwise) is refined by Levenberg-Marquardt with the camera fixed.
    /// Refinement must reach the tolerance within the iteration budget.
    ///
    /// Near-fronto-parallel planar targets admit two poses with similar
    /// error; the one the refinement settles in is returned.
    pub fn solve(
        &self,
        correspondences: &ObservationSet,
        camera: &PinholeCamera,
    ) -> Result<PoseSolution, PoseError> {
        let (n3, n2) = (
            correspondences.points_3d.len(),
            correspondences.points_2d.len(),
        );
        if n3 != n2 || n3 < MIN_CORRESPONDENCES {
            return Err(PoseError::InsufficientCorrespondences { found: n3.min(n2) });
        }
        let n = n3;
        if let Some(index) = correspondences.first_non_finite() {
            return Err(PoseError::NonFinitePoint { index });
        }

        let normalized: Vec<Pt2> = correspondences
            .points_2d
            .iter()
            .map(|px| Pt2::from(camera.undistort_pixel(px)))
            .collect();
        let init = Pose::from(initial_pose(&correspondences.points_3d, &normalized)?);

        let refined = match refine_pose(
            &LmBackend,
            correspondences,
            camera,
            &init,
            &self.options.solve,
        ) {
            Ok(refined) => refined,
            Err(SolveError::Degenerate { rcond, .. }) => {
                return Err(PoseError::Degenerate { rcond })
            }
            Err(SolveError::NumericalFailure { iteration, .. }) => {
                return Err(PoseError::NotConverged {
                    iterations: iteration,
                    rms: Real::NAN,
                })
            }
            Err(SolveError::DimensionMismatch { .. }) => {
                return Err(PoseError::InsufficientCorrespondences { found: n })
            }
        };

        let rms = reprojection_stats(correspondences, &refined.pose, camera).rms;
        let iterations = refined.report.iterations;
        trace!(
            "pose: {:?} after {iterations} iterations, rms {rms:.4}",
            refined.report.termination
        );
        if refined.report.termination != Termination::Converged || !rms.is_finite() {
            return Err(PoseError::NotConverged { iterations, rms });
        }
        Ok(PoseSolution {
            pose: refined.pose,
            rms,
            iterations,
        })
    }
}
