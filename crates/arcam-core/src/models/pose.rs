use crate::{rotation_from_rvec, rvec_from_rotation, Iso3, Mat3, Pt3, Real, Vec3};
use nalgebra::Translation3;
use serde::{Deserialize, Serialize};

/// Rigid transform taking target-frame points into the camera frame (`T_C_T`).
///
/// The rotation is held as a unit quaternion, so it is a proper rotation by
/// construction. File formats exchange it as a Rodrigues vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose(pub Iso3);

impl Pose {
    pub fn identity() -> Self {
        Self(Iso3::identity())
    }

    /// Build from a Rodrigues rotation vector and a translation.
    pub fn from_rvec_tvec(rvec: Vec3, tvec: Vec3) -> Self {
        Self(Iso3::from_parts(
            Translation3::from(tvec),
            rotation_from_rvec(&rvec),
        ))
    }

    pub fn rvec(&self) -> Vec3 {
        rvec_from_rotation(&self.0.rotation)
    }

    pub fn tvec(&self) -> Vec3 {
        self.0.translation.vector
    }

    pub fn rotation_matrix(&self) -> Mat3 {
        self.0.rotation.to_rotation_matrix().into_inner()
    }

    #[inline]
    pub fn iso(&self) -> &Iso3 {
        &self.0
    }

    /// Transform a target-frame point into the camera frame.
    #[inline]
    pub fn transform_point(&self, p: &Pt3) -> Pt3 {
        self.0.transform_point(p)
    }

    /// Rotation angle between two poses, radians.
    pub fn rotation_angle_to(&self, other: &Pose) -> Real {
        // atan2 keeps precision for tiny angles, unlike acos(w)
        let q = self.0.rotation.inverse() * other.0.rotation;
        2.0 * q.imag().norm().atan2(q.scalar().abs())
    }

    /// Euclidean distance between the translations of two poses.
    pub fn translation_distance_to(&self, other: &Pose) -> Real {
        (self.tvec() - other.tvec()).norm()
    }
}

impl From<Iso3> for Pose {
    fn from(iso: Iso3) -> Self {
        Self(iso)
    }
}

impl From<Pose> for Iso3 {
    fn from(pose: Pose) -> Self {
        pose.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rvec_tvec_round_trip() {
        let rvec = Vec3::new(0.2, -0.1, 0.3);
        let tvec = Vec3::new(1.0, 2.0, 10.0);
        let pose = Pose::from_rvec_tvec(rvec, tvec);
        assert!((pose.rvec() - rvec).norm() < 1e-12);
        assert_eq!(pose.tvec(), tvec);

        let r = pose.rotation_matrix();
        assert!((r.determinant() - 1.0).abs() < 1e-12);
        assert!((r.transpose() * r - Mat3::identity()).norm() < 1e-12);
    }

    #[test]
    fn serializes_transparently() {
        let pose = Pose::from_rvec_tvec(Vec3::new(0.0, 0.1, 0.0), Vec3::new(0.0, 0.0, 5.0));
        let json = serde_json::to_string(&pose).unwrap();
        let iso: Iso3 = serde_json::from_str(&json).unwrap();
        assert_eq!(Pose::from(iso), pose);
    }
}
