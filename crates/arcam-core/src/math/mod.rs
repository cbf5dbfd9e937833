//! Mathematical utilities and type definitions.
//!
//! This module provides fundamental types used throughout the workspace
//! and small helpers for homogeneous coordinates and rotation vectors.

use nalgebra::{Isometry3, Matrix2, Matrix3, Matrix4, Point2, Point3, UnitQuaternion, Vector2, Vector3};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 2D vector with [`Real`] components.
pub type Vec2 = Vector2<Real>;
/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 2D point with [`Real`] coordinates.
pub type Pt2 = Point2<Real>;
/// 3D point with [`Real`] coordinates.
pub type Pt3 = Point3<Real>;
/// 2×2 matrix with [`Real`] entries.
pub type Mat2 = Matrix2<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 4×4 matrix with [`Real`] entries.
pub type Mat4 = Matrix4<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Convert a 2D point in Euclidean coordinates into homogeneous coordinates.
///
/// Given a point `p = (x, y)`, returns the homogeneous vector `(x, y, 1)`.
pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

/// Convert a 3D homogeneous vector back to a 2D point.
///
/// The input is interpreted as `(x, y, w)` and the result is `(x / w, y / w)`.
/// The caller is responsible for ensuring that `w != 0`.
pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Skew-symmetric matrix `[v]×` such that `[v]× w = v × w`.
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Rotation from an axis-angle (Rodrigues) vector.
pub fn rotation_from_rvec(rvec: &Vec3) -> UnitQuaternion<Real> {
    UnitQuaternion::from_scaled_axis(*rvec)
}

/// Axis-angle (Rodrigues) vector of a rotation, with angle in `[0, π]`.
pub fn rvec_from_rotation(rot: &UnitQuaternion<Real>) -> Vec3 {
    rot.scaled_axis()
}

/// Left-multiplicative rotation update `exp(δω) · R` expressed as a new rotation vector.
pub fn compose_rvec_left(delta: &Vec3, rvec: &Vec3) -> Vec3 {
    rvec_from_rotation(&(rotation_from_rvec(delta) * rotation_from_rvec(rvec)))
}

/// Left Jacobian of SO(3) at `omega`: `exp(ω + δ) ≈ exp(J_l(ω) δ) · exp(ω)`.
pub fn so3_left_jacobian(omega: &Vec3) -> Mat3 {
    let theta2 = omega.norm_squared();
    let k = skew(omega);
    if theta2 < 1e-10 {
        return Mat3::identity() + k * 0.5 + k * k / 6.0;
    }
    let theta = theta2.sqrt();
    Mat3::identity() + k * ((1.0 - theta.cos()) / theta2) + k * k * ((theta - theta.sin()) / (theta2 * theta))
}

/// Centroid of a non-empty point set; `None` for empty input.
pub fn centroid(points: &[Pt3]) -> Option<Pt3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
    Some(Pt3::from(sum / points.len() as Real))
}
