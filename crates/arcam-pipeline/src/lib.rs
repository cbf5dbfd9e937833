//! Calibration and tracking pipeline for `arcam`.
//!
//! - [`collector`]: validated accumulation of checkerboard observations.
//! - [`calibration`]: intrinsics and distortion from five or more views.
//! - [`pose`]: per-frame target pose with a calibrated camera.
//! - [`frame_loop`]: the detect, solve, project and render loop.
//! - [`param_store`] and [`pose_log`]: text files shared with other tools.
//!
//! Detection, image I/O and display live behind the traits in
//! [`frame_loop`]; this crate has no image dependencies.

pub mod calibration;
pub mod capture;
pub mod collector;
pub mod config;
pub mod frame_loop;
pub mod marker;
pub mod param_store;
pub mod pose;
pub mod pose_log;

pub use calibration::{
    CalibrationError, CalibrationEstimator, CalibrationResult, EstimatorOptions, MIN_OBSERVATIONS,
};
pub use capture::{CaptureCommand, CaptureEvent, CaptureSession};
pub use collector::{target_points, CornerObservationCollector, GridSize, Rejected};
pub use config::ArConfig;
pub use frame_loop::{
    ArFrameLoop, CheckerboardTarget, ControlInput, ControlSignal, CornerDetector, FrameOutcome,
    FrameSource, LoopError, LoopState, LoopSummary, MarkerDetector, MarkerTarget, OverlayTracker,
    Renderer, RunToEnd, Segment, TargetDetector, TargetKind, DETECTION_COLOR,
};
pub use marker::{marker_corners, marker_observation, MarkerDetection};
pub use param_store::{
    format_params, parse_params, read_params, write_extrinsics, write_params, CalibrationParams,
    ParamError,
};
pub use pose::{PoseError, PoseEstimator, PoseOptions, PoseSolution, MIN_CORRESPONDENCES};
pub use pose_log::{read_pose_log, PoseLog, PoseLogError};

pub use arcam_optim::{SolveOptions, Termination};
