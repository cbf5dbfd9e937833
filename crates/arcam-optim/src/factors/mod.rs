//! Residual blocks shared by the optimization problems.

pub mod reprojection;

pub use reprojection::*;
