use arcam_core::{Iso3, Mat3, Real, Vec3};
use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanarPoseError {
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("homography does not describe a plane in front of the camera")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Pose of a planar target (`Z = 0` in its own frame) from a plane-to-image
/// homography `H ~ K [r1 r2 t]`.
///
/// The scale is taken from the average norm of the first two columns of
/// `K⁻¹H`; its sign is chosen so that the target lies in front of the
/// camera (`t.z > 0`). The rotation is projected onto SO(3).
///
/// Returns `T_C_T`, mapping target coordinates into camera coordinates.
pub fn pose_from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PlanarPoseError> {
    let k_inv = kmtx
        .try_inverse()
        .ok_or(PlanarPoseError::SingularIntrinsics)?;

    let a = k_inv * hmtx;
    let a1: Vec3 = a.column(0).into_owned();
    let a2: Vec3 = a.column(1).into_owned();
    let a3: Vec3 = a.column(2).into_owned();

    let mean_norm = 0.5 * (a1.norm() + a2.norm());
    if !mean_norm.is_finite() || mean_norm <= Real::EPSILON {
        return Err(PlanarPoseError::Degenerate);
    }
    let mut lambda = 1.0 / mean_norm;
    if a3.z < 0.0 {
        lambda = -lambda;
    }

    let r1 = a1 * lambda;
    let r2 = a2 * lambda;
    let r3 = r1.cross(&r2);
    let t = a3 * lambda;
    if t.z <= 0.0 {
        return Err(PlanarPoseError::Degenerate);
    }

    let r_approx = Mat3::from_columns(&[r1, r2, r3]);

    // Project onto SO(3) (polar decomposition via SVD)
    let svd = r_approx.svd(true, true);
    let u = svd.u.ok_or(PlanarPoseError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PlanarPoseError::SvdFailed)?;
    let mut r_orth = u * v_t;
    if r_orth.determinant() < 0.0 {
        let mut u_flipped = u;
        u_flipped.column_mut(2).neg_mut();
        r_orth = u_flipped * v_t;
    }

    let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
    Ok(Iso3::from_parts(Translation3::from(t), rot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcam_core::{Intrinsics, Pose};

    fn make_kmtx() -> Mat3 {
        Intrinsics::new(800.0, 780.0, 640.0, 360.0)
            .unwrap()
            .k_matrix()
    }

    fn synthetic_homography(kmtx: &Mat3, pose: &Pose) -> Mat3 {
        let r = pose.rotation_matrix();
        let mut hmtx = Mat3::zeros();
        hmtx.set_column(0, &(kmtx * r.column(0)));
        hmtx.set_column(1, &(kmtx * r.column(1)));
        hmtx.set_column(2, &(kmtx * pose.tvec()));
        hmtx
    }

    #[test]
    fn planar_pose_from_h_recovers_pose() {
        let kmtx = make_kmtx();
        let gt = Pose::from_rvec_tvec(Vec3::new(0.1, -0.05, 0.2), Vec3::new(0.1, -0.05, 1.0));

        let est = Pose::from(pose_from_homography(&kmtx, &synthetic_homography(&kmtx, &gt)).unwrap());

        assert!(est.translation_distance_to(&gt) < 1e-9);
        assert!(est.rotation_angle_to(&gt) < 1e-9);
    }

    #[test]
    fn negated_homography_gives_the_same_pose() {
        let kmtx = make_kmtx();
        let gt = Pose::from_rvec_tvec(Vec3::new(-0.3, 0.2, 0.0), Vec3::new(-0.4, 0.2, 3.0));
        let h = -synthetic_homography(&kmtx, &gt) * 7.5;

        let est = Pose::from(pose_from_homography(&kmtx, &h).unwrap());
        assert!(est.tvec().z > 0.0);
        assert!(est.translation_distance_to(&gt) < 1e-9);
        assert!(est.rotation_angle_to(&gt) < 1e-9);
    }

    #[test]
    fn zero_homography_is_degenerate() {
        assert_eq!(
            pose_from_homography(&make_kmtx(), &Mat3::zeros()),
            Err(PlanarPoseError::Degenerate)
        );
        assert_eq!(
            pose_from_homography(&Mat3::zeros(), &Mat3::identity()),
            Err(PlanarPoseError::SingularIntrinsics)
        );
    }
}
