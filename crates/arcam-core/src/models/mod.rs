//! Camera model building blocks.
//!
//! A [`PinholeCamera`] pairs zero-skew [`Intrinsics`] with the
//! [`BrownConrady5`] lens model; a [`Pose`] places the camera relative to a
//! target.

mod camera;
mod distortion;
mod intrinsics;
mod pose;

pub use camera::*;
pub use distortion::*;
pub use intrinsics::*;
pub use pose::*;
