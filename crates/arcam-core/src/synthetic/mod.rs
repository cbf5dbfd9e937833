//! Synthetic data generation utilities.
//!
//! Used by tests across the workspace to build exact correspondences from a
//! known camera, target and set of poses.

pub mod noise;
pub mod planar;
