//! Pixel reprojection residual with analytic Jacobians.
//!
//! Camera block layout: `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`.
//! Pose block layout: `[δω, δt]` with the left perturbation
//! `R ← exp(δω) R`, `t ← t + δt`, so `∂p_c/∂δω = -[R p]×` and
//! `∂p_c/∂δt = I`.

use arcam_core::{skew, Iso3, PinholeCamera, Pt2, Pt3, Real, Vec2, Vec3};
use nalgebra::SMatrix;

/// Dimension of the camera parameter block.
pub const CAMERA_DIM: usize = 9;
/// Dimension of the pose tangent block.
pub const POSE_DIM: usize = 6;

pub type CameraJacobian = SMatrix<Real, 2, CAMERA_DIM>;
pub type PoseJacobian = SMatrix<Real, 2, POSE_DIM>;

/// Residual `projected - observed` and its Jacobians.
#[derive(Debug, Clone, Copy)]
pub struct ReprojectionTerm {
    pub residual: Vec2,
    pub d_camera: CameraJacobian,
    pub d_pose: PoseJacobian,
}

/// Residual `projected - observed`, or `None` if the point is not in front
/// of the camera.
pub fn reprojection_residual(
    camera: &PinholeCamera,
    pose: &Iso3,
    point: &Pt3,
    observed: &Pt2,
) -> Option<Vec2> {
    camera
        .project_point_c(&pose.transform_point(point))
        .map(|px| px - observed)
}

/// Residual plus analytic Jacobians with respect to the camera block and
/// the pose tangent block.
pub fn reprojection_term(
    camera: &PinholeCamera,
    pose: &Iso3,
    point: &Pt3,
    observed: &Pt2,
) -> Option<ReprojectionTerm> {
    let rotated: Vec3 = pose.rotation * point.coords;
    let p_cam = rotated + pose.translation.vector;
    if p_cam.z.is_nan() || p_cam.z <= 0.0 {
        return None;
    }
    let inv_z = 1.0 / p_cam.z;
    let n = Vec2::new(p_cam.x * inv_z, p_cam.y * inv_z);

    let k = &camera.intrinsics;
    let (nd, d_n, d_coeffs) = camera.distortion.distort_with_jacobians(&n);
    let residual = Vec2::new(k.fx * nd.x + k.cx - observed.x, k.fy * nd.y + k.cy - observed.y);
    if !(residual.x.is_finite() && residual.y.is_finite()) {
        return None;
    }

    let mut d_camera = CameraJacobian::zeros();
    d_camera[(0, 0)] = nd.x;
    d_camera[(1, 1)] = nd.y;
    d_camera[(0, 2)] = 1.0;
    d_camera[(1, 3)] = 1.0;
    for c in 0..5 {
        d_camera[(0, 4 + c)] = k.fx * d_coeffs[(0, c)];
        d_camera[(1, 4 + c)] = k.fy * d_coeffs[(1, c)];
    }

    // ∂n/∂p_cam
    let d_n_d_pc = SMatrix::<Real, 2, 3>::new(
        inv_z,
        0.0,
        -p_cam.x * inv_z * inv_z,
        0.0,
        inv_z,
        -p_cam.y * inv_z * inv_z,
    );
    let scale = SMatrix::<Real, 2, 2>::new(k.fx, 0.0, 0.0, k.fy);
    let d_px_d_pc = scale * d_n * d_n_d_pc;

    let mut d_pose = PoseJacobian::zeros();
    d_pose
        .fixed_view_mut::<2, 3>(0, 0)
        .copy_from(&(d_px_d_pc * (-skew(&rotated))));
    d_pose.fixed_view_mut::<2, 3>(0, 3).copy_from(&d_px_d_pc);

    Some(ReprojectionTerm {
        residual,
        d_camera,
        d_pose,
    })
}
