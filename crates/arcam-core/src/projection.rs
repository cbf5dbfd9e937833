//! Projection engine.
//!
//! Pure functions mapping target-frame points through a pose and a
//! [`PinholeCamera`] into pixels. Points that end up on or behind the image
//! plane are reported as `None` rather than as a finite pixel.

use crate::{ObservationSet, PinholeCamera, Pose, Pt2, Pt3, Real, ReprojectionStats};

/// Project a single target-frame point.
#[inline]
pub fn project_point(point: &Pt3, pose: &Pose, camera: &PinholeCamera) -> Option<Pt2> {
    camera.project_point(pose, point)
}

/// Project a batch of target-frame points, preserving order.
pub fn project_points(points: &[Pt3], pose: &Pose, camera: &PinholeCamera) -> Vec<Option<Pt2>> {
    points
        .iter()
        .map(|p| project_point(p, pose, camera))
        .collect()
}

/// Per-correspondence pixel error; `None` where the point is not projectable.
pub fn reprojection_errors(
    observation: &ObservationSet,
    pose: &Pose,
    camera: &PinholeCamera,
) -> Vec<Option<Real>> {
    observation
        .pairs()
        .map(|(pw, px)| project_point(pw, pose, camera).map(|proj| (proj - px).norm()))
        .collect()
}

/// Error statistics for one observation. Unprojectable points count as
/// infinite error so they cannot hide inside a small RMS.
pub fn reprojection_stats(
    observation: &ObservationSet,
    pose: &Pose,
    camera: &PinholeCamera,
) -> ReprojectionStats {
    let errors: Vec<Real> = reprojection_errors(observation, pose, camera)
        .into_iter()
        .map(|e| e.unwrap_or(Real::INFINITY))
        .collect();
    ReprojectionStats::from_errors(&errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrownConrady5, Intrinsics, Vec3};

    fn camera(distortion: BrownConrady5) -> PinholeCamera {
        PinholeCamera::new(
            Intrinsics::new(800.0, 790.0, 320.0, 240.0).unwrap(),
            distortion,
        )
    }

    #[test]
    fn point_on_optical_axis_hits_principal_point() {
        let cam = camera(BrownConrady5::default());
        for depth in [0.5, 1.0, 42.0] {
            let px = project_point(&Pt3::new(0.0, 0.0, depth), &Pose::identity(), &cam).unwrap();
            assert!((px - Pt2::new(320.0, 240.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn zero_distortion_matches_pinhole() {
        let cam = camera(BrownConrady5::default());
        let pose = Pose::from_rvec_tvec(Vec3::new(0.1, -0.2, 0.05), Vec3::new(0.3, -0.1, 6.0));
        let points = [
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, -2.0, 0.0),
            Pt3::new(-1.5, 0.5, 0.7),
        ];
        for (p, px) in points.iter().zip(project_points(&points, &pose, &cam)) {
            let pc = pose.transform_point(p);
            let expected = Pt2::new(800.0 * pc.x / pc.z + 320.0, 790.0 * pc.y / pc.z + 240.0);
            assert!((px.unwrap() - expected).norm() < 1e-9);
        }
    }

    #[test]
    fn distortion_moves_off_axis_points() {
        let dist = BrownConrady5 {
            k1: -0.3,
            ..Default::default()
        };
        let p = Pt3::new(1.0, 1.0, 4.0);
        let center = Pt2::new(320.0, 240.0);
        let ideal = project_point(&p, &Pose::identity(), &camera(BrownConrady5::default())).unwrap();
        let distorted = project_point(&p, &Pose::identity(), &camera(dist)).unwrap();
        // barrel distortion pulls the point toward the centre
        assert!((distorted - center).norm() < (ideal - center).norm());
    }

    #[test]
    fn behind_camera_points_are_flagged() {
        let cam = camera(BrownConrady5::default());
        let pose = Pose::from_rvec_tvec(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0));
        let out = project_points(
            &[Pt3::new(0.0, 0.0, -2.0), Pt3::new(0.0, 0.0, -3.0), Pt3::new(0.0, 0.0, 1.0)],
            &pose,
            &cam,
        );
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert!(out[2].is_some());
    }

    #[test]
    fn stats_of_exact_observation_are_zero() {
        let cam = camera(BrownConrady5::default());
        let pose = Pose::from_rvec_tvec(Vec3::zeros(), Vec3::new(0.0, 0.0, 5.0));
        let world = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)];
        let image = project_points(&world, &pose, &cam)
            .into_iter()
            .map(Option::unwrap)
            .collect();
        let obs = ObservationSet::new(world, image).unwrap();
        let stats = reprojection_stats(&obs, &pose, &cam);
        assert_eq!(stats.count, 2);
        assert!(stats.rms < 1e-12);
    }
}
