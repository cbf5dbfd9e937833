//! Batch camera calibration from planar target observations.
//!
//! Steps:
//! 1. seed intrinsics (principal point at the image centre, focal lengths
//!    from the view homographies or `max(width, height)`), zero distortion;
//! 2. closed-form pose per view from its homography;
//! 3. joint Levenberg-Marquardt over camera and poses;
//! 4. conditioning of the intrinsics with distortion and poses eliminated;
//! 5. RMS reprojection error over every correspondence.

use arcam_core::{
    reprojection_stats, ImageSize, Intrinsics, IntrinsicsError, Mat3, ObservationSet,
    PinholeCamera, Pose, Real, ReprojectionStats,
};
use arcam_linear::{
    dlt_homography, estimate_focal_from_homographies, pose_from_homography, HomographyError,
    PlanarPoseError,
};
use arcam_optim::problems::refine_planar_intrinsics;
use arcam_optim::{LmBackend, SolveError, SolveOptions, Termination};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Views required before a solve is attempted.
pub const MIN_OBSERVATIONS: usize = 5;
/// Target points further than this from `z = 0` make a view non-planar.
const PLANAR_Z_TOL: Real = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorOptions {
    /// Minimum number of observations; values below 5 are raised to 5.
    pub min_observations: usize,
    pub solve: SolveOptions,
    /// Marginal reciprocal condition of `[fx, fy, cx, cy]` below which the
    /// views cannot separate focal length from depth.
    pub intrinsics_rcond_threshold: Real,
}

impl Default for EstimatorOptions {
    fn default() -> Self {
        Self {
            min_observations: MIN_OBSERVATIONS,
            solve: SolveOptions::default(),
            intrinsics_rcond_threshold: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("need at least {required} observations, got {found}")]
    InsufficientSamples { found: usize, required: usize },
    #[error("observation {index}: {reason}")]
    InvalidObservation { index: usize, reason: String },
    #[error("observation {index}: homography failed: {source}")]
    Homography {
        index: usize,
        #[source]
        source: HomographyError,
    },
    #[error("observation {index}: initial pose failed: {source}")]
    InitialPose {
        index: usize,
        #[source]
        source: PlanarPoseError,
    },
    #[error("calibration is degenerate at iteration {iteration} (rcond={rcond:e}); vary the target orientation between views")]
    Degenerate { iteration: usize, rcond: Real },
    #[error("numerical failure at iteration {iteration} (cost={cost})")]
    NumericalFailure { iteration: usize, cost: Real },
    #[error("solver returned non-physical intrinsics after {iterations} iterations: {source}")]
    NonPhysical {
        iterations: usize,
        #[source]
        source: IntrinsicsError,
    },
}

impl From<SolveError> for CalibrationError {
    fn from(err: SolveError) -> Self {
        match err {
            SolveError::Degenerate { iteration, rcond } => Self::Degenerate { iteration, rcond },
            SolveError::NumericalFailure { iteration, cost } => {
                Self::NumericalFailure { iteration, cost }
            }
            SolveError::DimensionMismatch { .. } => Self::NumericalFailure {
                iteration: 0,
                cost: Real::NAN,
            },
        }
    }
}

/// Camera, per-view extrinsics and fit quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub camera: PinholeCamera,
    /// One pose per input observation, in input order.
    pub poses: Vec<Pose>,
    /// RMS pixel reprojection error over all correspondences.
    pub rms: Real,
    pub per_view: Vec<ReprojectionStats>,
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationEstimator {
    options: EstimatorOptions,
}

impl CalibrationEstimator {
    pub fn new(options: EstimatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EstimatorOptions {
        &self.options
    }

    fn required(&self) -> usize {
        self.options.min_observations.max(MIN_OBSERVATIONS)
    }

    /// Estimate intrinsics, distortion and per-view poses.
    ///
    /// Preconditions are checked before any numerical work: at least five
    /// observations of at least four coplanar (`z = 0`) correspondences each.
    /// Deterministic for identical inputs.
    pub fn estimate(
        &self,
        observations: &[ObservationSet],
        image_size: ImageSize,
    ) -> Result<CalibrationResult, CalibrationError> {
        let required = self.required();
        if observations.len() < required {
            return Err(CalibrationError::InsufficientSamples {
                found: observations.len(),
                required,
            });
        }
        for (index, obs) in observations.iter().enumerate() {
            validate_observation(obs).map_err(|reason| CalibrationError::InvalidObservation {
                index,
                reason,
            })?;
        }

        let homographies = observations
            .iter()
            .enumerate()
            .map(|(index, obs)| {
                dlt_homography(&obs.planar_points(), &obs.points_2d)
                    .map_err(|source| CalibrationError::Homography { index, source })
            })
            .collect::<Result<Vec<Mat3>, _>>()?;

        let center = image_size.center();
        let focal = estimate_focal_from_homographies(&homographies, &image_size);
        debug!(
            "initial focal fx={:.2} fy={:.2}{}",
            focal.fx,
            focal.fy,
            if focal.fallback { " (fallback)" } else { "" }
        );
        let seed = PinholeCamera::ideal(Intrinsics {
            fx: focal.fx,
            fy: focal.fy,
            cx: center.x,
            cy: center.y,
        });

        let kmtx = seed.intrinsics.k_matrix();
        let poses = homographies
            .iter()
            .enumerate()
            .map(|(index, h)| {
                pose_from_homography(&kmtx, h)
                    .map(Pose::from)
                    .map_err(|source| CalibrationError::InitialPose { index, source })
            })
            .collect::<Result<Vec<Pose>, _>>()?;

        let refined = refine_planar_intrinsics(
            &LmBackend,
            observations,
            &seed,
            &poses,
            &self.options.solve,
        )?;
        let report = refined.report;

        let per_view: Vec<ReprojectionStats> = observations
            .iter()
            .zip(&refined.poses)
            .map(|(obs, pose)| reprojection_stats(obs, pose, &refined.camera))
            .collect();
        let rms = overall_rms(&per_view);

        if refined.intrinsics_rcond < self.options.intrinsics_rcond_threshold {
            warn!(
                "intrinsics are not observable from these views (rcond {:.3e}{})",
                refined.intrinsics_rcond,
                if focal.fallback { ", focal seed fell back" } else { "" }
            );
            return Err(CalibrationError::Degenerate {
                iteration: report.iterations,
                rcond: refined.intrinsics_rcond,
            });
        }
        refined
            .camera
            .intrinsics
            .validate()
            .map_err(|source| CalibrationError::NonPhysical {
                iterations: report.iterations,
                source,
            })?;
        if !rms.is_finite() {
            return Err(CalibrationError::NumericalFailure {
                iteration: report.iterations,
                cost: report.final_cost,
            });
        }

        info!(
            "calibrated {} views: rms {:.4} px after {} iterations ({:?})",
            observations.len(),
            rms,
            report.iterations,
            report.termination
        );
        Ok(CalibrationResult {
            camera: refined.camera,
            poses: refined.poses,
            rms,
            per_view,
            iterations: report.iterations,
            termination: report.termination,
        })
    }
}

fn validate_observation(obs: &ObservationSet) -> Result<(), String> {
    if obs.points_3d.len() != obs.points_2d.len() {
        return Err(format!(
            "{} target points but {} image points",
            obs.points_3d.len(),
            obs.points_2d.len()
        ));
    }
    if obs.len() < 4 {
        return Err(format!("need at least 4 correspondences, got {}", obs.len()));
    }
    if let Some(point) = obs.first_non_finite() {
        return Err(format!("correspondence {point} has a non-finite coordinate"));
    }
    if !obs.is_on_z0_plane(PLANAR_Z_TOL) {
        return Err("target points must lie on the z = 0 plane".to_string());
    }
    Ok(())
}

fn overall_rms(per_view: &[ReprojectionStats]) -> Real {
    let (sum_sq, count) = per_view.iter().fold((0.0, 0usize), |(s, n), v| {
        (s + v.rms * v.rms * v.count as Real, n + v.count)
    });
    if count == 0 {
        0.0
    } else {
        (sum_sq / count as Real).sqrt()
    }
}
