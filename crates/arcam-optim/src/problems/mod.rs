//! Concrete least-squares problems and their parameter packing.

pub mod planar_intrinsics;
pub mod pose;

use crate::factors::{PoseJacobian, CAMERA_DIM, POSE_DIM};
use arcam_core::{
    rotation_from_rvec, rvec_from_rotation, so3_left_jacobian, BrownConrady5, Intrinsics, Iso3,
    PinholeCamera, Pose, Real, Vec3,
};
use nalgebra::{DVectorView, Translation3, UnitQuaternion};

pub use planar_intrinsics::{refine_planar_intrinsics, PlanarIntrinsicsProblem, PlanarRefinement};
pub use pose::{refine_pose, PoseProblem, PoseRefinement};

/// Write `[fx, fy, cx, cy, k1, k2, p1, p2, k3]` into `out`.
pub fn pack_camera(camera: &PinholeCamera, out: &mut [Real]) {
    let k = &camera.intrinsics;
    out[..4].copy_from_slice(&[k.fx, k.fy, k.cx, k.cy]);
    out[4..CAMERA_DIM].copy_from_slice(&camera.distortion.coeffs());
}

/// Inverse of [`pack_camera`]. No validation: iterates may be unphysical.
pub fn unpack_camera(x: DVectorView<'_, Real>) -> PinholeCamera {
    PinholeCamera::new(
        Intrinsics {
            fx: x[0],
            fy: x[1],
            cx: x[2],
            cy: x[3],
        },
        BrownConrady5::from_array([x[4], x[5], x[6], x[7], x[8]]),
    )
}

/// Pose block anchored at a fixed rotation.
///
/// The block stores `[ω, t]` with `R = exp(ω) · R₀`, so a plain additive
/// step on `ω` moves the rotation along SO(3) and `ω` stays small around
/// the anchor even for rotations near π.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredPose {
    anchor: UnitQuaternion<Real>,
}

impl AnchoredPose {
    pub fn new(anchor: &Pose) -> Self {
        Self {
            anchor: anchor.0.rotation,
        }
    }

    /// Write `[ω, t]` for `pose` relative to the anchor.
    pub fn pack(&self, pose: &Pose, out: &mut [Real]) {
        let omega = rvec_from_rotation(&(pose.0.rotation * self.anchor.inverse()));
        out[..3].copy_from_slice(omega.as_slice());
        out[3..POSE_DIM].copy_from_slice(pose.tvec().as_slice());
    }

    pub fn unpack(&self, x: DVectorView<'_, Real>) -> Pose {
        let omega = Vec3::new(x[0], x[1], x[2]);
        let t = Vec3::new(x[3], x[4], x[5]);
        Pose(Iso3::from_parts(
            Translation3::from(t),
            rotation_from_rvec(&omega) * self.anchor,
        ))
    }

    /// Chain a Jacobian taken w.r.t. the left perturbation `[δω, δt]` into
    /// one w.r.t. the stored `[ω, t]`.
    pub fn chain(&self, x: DVectorView<'_, Real>, d_pose: &PoseJacobian) -> PoseJacobian {
        let jl = so3_left_jacobian(&Vec3::new(x[0], x[1], x[2]));
        let mut out = *d_pose;
        out.fixed_view_mut::<2, 3>(0, 0)
            .copy_from(&(d_pose.fixed_view::<2, 3>(0, 0) * jl));
        out
    }
}
