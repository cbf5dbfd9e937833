//! Linear initialization algorithms for camera calibration and tracking.
//!
//! These closed-form solvers seed the non-linear refinement in
//! `arcam-optim`:
//!
//! - [`homography`]: normalized DLT plane-to-image homography,
//! - [`intrinsics_init`]: focal lengths from homographies with a fixed
//!   principal point,
//! - [`planar_pose`]: pose of a planar target from a homography,
//! - [`plane`]: planarity / collinearity analysis of target points,
//! - [`pnp`]: DLT PnP for non-planar targets,
//! - [`pose_init`]: picks the right solver for a set of correspondences.
//!
//! All functions are deterministic and return typed errors.

pub mod homography;
pub mod intrinsics_init;
pub mod planar_pose;
pub mod plane;
pub mod pnp;
pub mod pose_init;

pub use homography::{dlt_homography, HomographyError};
pub use intrinsics_init::{estimate_focal_from_homographies, FocalInit};
pub use planar_pose::{pose_from_homography, PlanarPoseError};
pub use plane::{analyze_points, PlaneFrame, PointLayout};
pub use pnp::{dlt_pnp, PnpError};
pub use pose_init::{initial_pose, PoseInitError};
