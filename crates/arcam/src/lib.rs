//! Entry crate for the `arcam` toolkit: calibrate a single camera from
//! checkerboard views, then track a planar target frame by frame and project
//! wireframe overlays onto it.
//!
//! ## Offline calibration
//!
//! ```no_run
//! use arcam::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut collector = CornerObservationCollector::new(GridSize::default(), 1.0);
//! # let detected_corners: Vec<Vec<Pt2>> = vec![];
//! for corners in &detected_corners {
//!     collector.accept(corners)?;
//! }
//! let result = CalibrationEstimator::default()
//!     .estimate(collector.all(), ImageSize::new(640, 480))?;
//! write_params(
//!     std::path::Path::new("calibration_parameters.txt"),
//!     &CalibrationParams { camera: result.camera, rms: Some(result.rms) },
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Per-frame pose and projection
//!
//! ```no_run
//! use arcam::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = read_params(std::path::Path::new("calibration_parameters.txt"))?;
//! # let observation = ObservationSet { points_3d: vec![], points_2d: vec![] };
//! let solution = PoseEstimator::default().solve(&observation, &params.camera)?;
//! let cube = OverlayModel::cube();
//! let pixels = project_points(&cube.points, &solution.pose, &params.camera);
//! # let _ = pixels;
//! # Ok(())
//! # }
//! ```
//!
//! For a full loop over a frame source, see [`pipeline::ArFrameLoop`].
//!
//! ## Module Organization
//!
//! - **[`core`]**: math types, camera model, projection, overlay shapes
//! - **[`linear`]**: closed-form homography, focal seed and pose initialisation
//! - **[`optim`]**: damped Levenberg-Marquardt and the refinement problems
//! - **[`pipeline`]**: collector, estimators, frame loop, file formats
//! - **[`prelude`]**: common re-exports

/// Math types, camera model, projection and overlay shapes.
pub mod core {
    pub use arcam_core::*;
}

/// Closed-form initialisation.
pub mod linear {
    pub use arcam_linear::*;
}

/// Non-linear least squares.
pub mod optim {
    pub use arcam_optim::*;
}

/// Calibration, tracking and persistence.
pub mod pipeline {
    pub use arcam_pipeline::*;
}

/// Import with `use arcam::prelude::*;`.
pub mod prelude {
    pub use crate::core::{
        project_points, BrownConrady5, ImageSize, Intrinsics, ObservationSet, OverlayLibrary,
        OverlayModel, PinholeCamera, Pose, Pt2, Pt3, Real, Vec3,
    };

    pub use crate::pipeline::{
        read_params, write_params, ArConfig, ArFrameLoop, CalibrationEstimator,
        CalibrationParams, CalibrationResult, CornerObservationCollector, EstimatorOptions,
        GridSize, OverlayTracker, PoseEstimator, PoseLog, PoseOptions, PoseSolution,
        SolveOptions,
    };
}
