use crate::{
    analyze_points, dlt_homography, dlt_pnp, pose_from_homography, HomographyError,
    PlanarPoseError, PnpError, PointLayout,
};
use arcam_core::{Iso3, Mat3, Pt2, Pt3};
use log::trace;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoseInitError {
    #[error("need at least 4 correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("target and image counts differ ({0} vs {1})")]
    CountMismatch(usize, usize),
    #[error("target points are collinear")]
    Collinear,
    #[error(transparent)]
    Homography(#[from] HomographyError),
    #[error(transparent)]
    PlanarPose(#[from] PlanarPoseError),
    #[error(transparent)]
    Pnp(#[from] PnpError),
}

/// Closed-form pose from target points and undistorted normalized image
/// coordinates.
///
/// Coplanar targets (any plane, not only `z = 0`) go through a homography
/// in the plane's own frame; other targets use the DLT PnP, which needs at
/// least six points.
pub fn initial_pose(world: &[Pt3], normalized: &[Pt2]) -> Result<Iso3, PoseInitError> {
    if world.len() != normalized.len() {
        return Err(PoseInitError::CountMismatch(world.len(), normalized.len()));
    }
    if world.len() < 4 {
        return Err(PoseInitError::NotEnoughPoints(world.len()));
    }

    match analyze_points(world) {
        PointLayout::Collinear => Err(PoseInitError::Collinear),
        PointLayout::Planar(frame) => {
            trace!("initial pose: planar target, {} points", world.len());
            let plane: Vec<Pt2> = world.iter().map(|p| frame.to_plane(p)).collect();
            let h = dlt_homography(&plane, normalized)?;
            let t_c_p = pose_from_homography(&Mat3::identity(), &h)?;
            Ok(t_c_p * frame.plane_to_target().inverse())
        }
        PointLayout::General => {
            trace!("initial pose: non-planar target, {} points", world.len());
            Ok(dlt_pnp(world, normalized)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcam_core::{Pose, Real, Vec3};
    use nalgebra::Rotation3;

    fn project(pose: &Pose, pts: &[Pt3]) -> Vec<Pt2> {
        pts.iter()
            .map(|p| {
                let pc = pose.transform_point(p);
                Pt2::new(pc.x / pc.z, pc.y / pc.z)
            })
            .collect()
    }

    #[test]
    fn planar_board() {
        let pts: Vec<Pt3> = (0..6)
            .flat_map(|i| (0..9).map(move |j| Pt3::new(j as Real, -(i as Real), 0.0)))
            .collect();
        let gt = Pose::from_rvec_tvec(Vec3::new(2.9, 0.2, -0.1), Vec3::new(-4.0, 2.0, 18.0));
        let est = Pose::from(initial_pose(&pts, &project(&gt, &pts)).unwrap());
        assert!(est.translation_distance_to(&gt) < 1e-8);
        assert!(est.rotation_angle_to(&gt) < 1e-8);
    }

    #[test]
    fn marker_square_on_tilted_plane() {
        let rot = Rotation3::from_euler_angles(0.3, 0.5, -0.2);
        let pts: Vec<Pt3> = [(-1.0, 1.0), (1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]
            .iter()
            .map(|&(x, y)| Pt3::from(rot * Vec3::new(x, y, 0.0) + Vec3::new(0.5, 0.0, 1.0)))
            .collect();
        let gt = Pose::from_rvec_tvec(Vec3::new(0.1, -0.1, 0.05), Vec3::new(0.0, 0.3, 8.0));
        let est = Pose::from(initial_pose(&pts, &project(&gt, &pts)).unwrap());
        assert!(est.translation_distance_to(&gt) < 1e-8);
        assert!(est.rotation_angle_to(&gt) < 1e-8);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let line: Vec<Pt3> = (0..5).map(|i| Pt3::new(i as Real, 0.0, 0.0)).collect();
        let img: Vec<Pt2> = (0..5).map(|i| Pt2::new(i as Real * 0.1, 0.0)).collect();
        assert_eq!(initial_pose(&line, &img), Err(PoseInitError::Collinear));
        assert_eq!(
            initial_pose(&line[..3], &img[..3]),
            Err(PoseInitError::NotEnoughPoints(3))
        );
    }
}
