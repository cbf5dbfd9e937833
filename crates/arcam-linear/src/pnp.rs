//! Direct Linear Transform (DLT) solver for camera pose estimation.
//!
//! Linear least-squares PnP on normalized image coordinates. Used for
//! targets whose points are not coplanar; the rotation block is projected
//! onto SO(3) via SVD.

use arcam_core::{centroid, Iso3, Mat3, Pt2, Pt3, Real, Vec3};
use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PnpError {
    #[error("need at least 6 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("world and image counts differ ({0} vs {1})")]
    CountMismatch(usize, usize),
    #[error("degenerate 3d point configuration")]
    Degenerate,
    #[error("svd failed in PnP DLT")]
    SvdFailed,
}

/// Direct linear PnP on all input points.
///
/// `world` are target points and `normalized` their undistorted
/// normalized image coordinates (`K⁻¹ · pixel`).
///
/// Returns `T_C_T`: the transform from target to camera coordinates.
pub fn dlt_pnp(world: &[Pt3], normalized: &[Pt2]) -> Result<Iso3, PnpError> {
    let n = world.len();
    if normalized.len() != n {
        return Err(PnpError::CountMismatch(n, normalized.len()));
    }
    if n < 6 {
        return Err(PnpError::NotEnoughPoints(n));
    }

    let c = centroid(world).ok_or(PnpError::Degenerate)?;
    let mean_dist = world.iter().map(|p| (p - c).norm()).sum::<Real>() / n as Real;
    if mean_dist <= Real::EPSILON {
        return Err(PnpError::Degenerate);
    }
    let scale = (3.0_f64).sqrt() / mean_dist;

    // 2n x 12 system for P = [R | t] acting on normalized world points
    let mut a = DMatrix::<Real>::zeros(2 * n, 12);
    for (i, (pw, pi)) in world.iter().zip(normalized.iter()).enumerate() {
        let q = (pw - c) * scale;
        let (x, y, z) = (q.x, q.y, q.z);
        let (u, v) = (pi.x, pi.y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = z;
        a[(r0, 3)] = 1.0;
        a[(r0, 8)] = -u * x;
        a[(r0, 9)] = -u * y;
        a[(r0, 10)] = -u * z;
        a[(r0, 11)] = -u;

        a[(r1, 4)] = x;
        a[(r1, 5)] = y;
        a[(r1, 6)] = z;
        a[(r1, 7)] = 1.0;
        a[(r1, 8)] = -v * x;
        a[(r1, 9)] = -v * y;
        a[(r1, 10)] = -v * z;
        a[(r1, 11)] = -v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(PnpError::SvdFailed)?;
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .ok_or(PnpError::SvdFailed)?;
    let h = v_t.row(smallest);

    // P_norm acts on scale * (p - c); fold the normalization back in.
    let m_norm = Mat3::new(h[0], h[1], h[2], h[4], h[5], h[6], h[8], h[9], h[10]);
    let t_norm = Vec3::new(h[3], h[7], h[11]);
    let m = m_norm * scale;
    let t = t_norm - m * c.coords;

    let mut s = (m.row(0).norm() + m.row(1).norm() + m.row(2).norm()) / 3.0;
    if s <= Real::EPSILON {
        return Err(PnpError::Degenerate);
    }
    if m.determinant() < 0.0 {
        s = -s;
    }
    let r_approx = m / s;
    let t = t / s;

    let svd = r_approx.svd(true, true);
    let u = svd.u.ok_or(PnpError::SvdFailed)?;
    let v_t = svd.v_t.ok_or(PnpError::SvdFailed)?;
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
    use arcam_core::Pose;

    fn volume_points() -> Vec<Pt3> {
        vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(2.0, 0.0, 0.0),
            Pt3::new(0.0, 2.0, 0.0),
            Pt3::new(2.0, 2.0, -2.0),
            Pt3::new(0.0, 0.0, -2.0),
            Pt3::new(1.0, -1.0, 1.0),
            Pt3::new(-1.5, 0.5, -0.5),
            Pt3::new(0.5, 1.5, 1.5),
        ]
    }

    fn normalized(pose: &Pose, pts: &[Pt3]) -> Vec<Pt2> {
        pts.iter()
            .map(|p| {
                let pc = pose.transform_point(p);
                Pt2::new(pc.x / pc.z, pc.y / pc.z)
            })
            .collect()
    }

    #[test]
    fn dlt_recovers_pose_of_a_volume() {
        let gt = Pose::from_rvec_tvec(Vec3::new(0.3, -0.2, 0.1), Vec3::new(0.2, -0.1, 9.0));
        let pts = volume_points();
        let est = Pose::from(dlt_pnp(&pts, &normalized(&gt, &pts)).unwrap());

        assert!(est.translation_distance_to(&gt) < 1e-8, "t {:?}", est.tvec());
        assert!(est.rotation_angle_to(&gt) < 1e-8);
    }

    #[test]
    fn rejects_too_few_points() {
        let pts = &volume_points()[..5];
        let img = vec![Pt2::origin(); 5];
        assert_eq!(dlt_pnp(pts, &img), Err(PnpError::NotEnoughPoints(5)));
        assert_eq!(
            dlt_pnp(pts, &img[..4]),
            Err(PnpError::CountMismatch(5, 4))
        );
    }
}
