//! Synthetic planar target helpers.
//!
//! The board follows the checkerboard convention used everywhere else in the
//! workspace: inner corner `(i, j)` (row `i`, column `j`) sits at
//! `(j * square, -i * square, 0)` and points are ordered row-major.

use super::noise::UniformPixelNoise;
use crate::{ObservationSet, PinholeCamera, Pose, Pt2, Pt3, Real, Vec3};
use anyhow::{anyhow, Result};
use nalgebra::{Rotation3, Translation3, UnitQuaternion};
use std::f64::consts::PI;

/// Board corners for a `rows × cols` inner-corner grid, row-major.
pub fn board_points(rows: usize, cols: usize, square: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        for j in 0..cols {
            points.push(Pt3::new(j as Real * square, -(i as Real) * square, 0.0));
        }
    }
    points
}

/// Centre of the board returned by [`board_points`].
pub fn board_center(rows: usize, cols: usize, square: Real) -> Pt3 {
    Pt3::new(
        (cols.saturating_sub(1)) as Real * square * 0.5,
        -((rows.saturating_sub(1)) as Real) * square * 0.5,
        0.0,
    )
}

/// Pose looking at `center` from `distance`, tilted by `(roll, pitch, yaw)`
/// and shifted sideways by `offset` in the image plane.
///
/// The board's printed face points toward the camera (`+z` of the board maps
/// to `-z` of the camera at zero tilt).
pub fn looking_at(center: &Pt3, distance: Real, tilt: Vec3, offset: (Real, Real)) -> Pose {
    let facing = UnitQuaternion::from_axis_angle(&Vec3::x_axis(), PI);
    let tilt = UnitQuaternion::from_rotation_matrix(&Rotation3::from_euler_angles(
        tilt.x, tilt.y, tilt.z,
    ));
    let rot = tilt * facing;
    let t = Vec3::new(offset.0, offset.1, distance) - rot * center.coords;
    Pose(crate::Iso3::from_parts(Translation3::from(t), rot))
}

/// `n_views` deterministic, well-spread poses around `center`.
///
/// Rotations vary about all three axes (up to ~0.35 rad), which is what the
/// intrinsics estimate needs to separate focal length from depth.
pub fn orbit_poses(n_views: usize, center: &Pt3, distance: Real) -> Vec<Pose> {
    (0..n_views)
        .map(|k| {
            let k = k as Real;
            let tilt = Vec3::new(
                0.35 * (1.7 * k + 0.4).sin(),
                0.35 * (2.3 * k + 0.9).cos(),
                0.25 * (0.9 * k).sin(),
            );
            let offset = (0.6 * (1.1 * k).sin(), 0.4 * (0.7 * k).cos());
            let depth = distance * (1.0 + 0.1 * (1.3 * k).cos());
            looking_at(center, depth, tilt, offset)
        })
        .collect()
}

/// `n_views` copies of the same head-on pose. Calibration from these is
/// degenerate: focal length trades off exactly against depth.
pub fn fronto_parallel_poses(n_views: usize, center: &Pt3, distance: Real) -> Vec<Pose> {
    vec![looking_at(center, distance, Vec3::zeros(), (0.0, 0.0)); n_views]
}

/// Project every target point; errors if any point is not projectable.
pub fn project_view(camera: &PinholeCamera, points: &[Pt3], pose: &Pose) -> Result<ObservationSet> {
    project_view_noisy(camera, points, pose, &UniformPixelNoise::default(), 0)
}

/// Like [`project_view`] with seeded pixel noise for view `view_idx`.
pub fn project_view_noisy(
    camera: &PinholeCamera,
    points: &[Pt3],
    pose: &Pose,
    noise: &UniformPixelNoise,
    view_idx: usize,
) -> Result<ObservationSet> {
    let mut pixels = points
        .iter()
        .enumerate()
        .map(|(point_idx, p)| {
            camera
                .project_point(pose, p)
                .ok_or_else(|| anyhow!("point {point_idx} is not projectable"))
        })
        .collect::<Result<Vec<Pt2>>>()?;
    noise.perturb(view_idx, &mut pixels);
    ObservationSet::new(points.to_vec(), pixels)
}

/// Project the target into every pose.
pub fn project_views(
    camera: &PinholeCamera,
    points: &[Pt3],
    poses: &[Pose],
) -> Result<Vec<ObservationSet>> {
    poses
        .iter()
        .map(|pose| project_view(camera, points, pose))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageSize, Intrinsics};

    #[test]
    fn board_layout_is_row_major_with_negative_rows() {
        let pts = board_points(2, 3, 0.5);
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[2], Pt3::new(1.0, 0.0, 0.0));
        assert_eq!(pts[3], Pt3::new(0.0, -0.5, 0.0));
        assert_eq!(board_center(2, 3, 0.5), Pt3::new(0.5, -0.25, 0.0));
    }

    #[test]
    fn orbit_views_stay_inside_the_image() {
        let cam = PinholeCamera::ideal(Intrinsics::new(800.0, 800.0, 319.5, 239.5).unwrap());
        let size = ImageSize::new(640, 480);
        let board = board_points(6, 9, 1.0);
        let center = board_center(6, 9, 1.0);
        let views = project_views(&cam, &board, &orbit_poses(8, &center, 20.0)).unwrap();
        for view in &views {
            assert!(view.points_2d.iter().all(|p| size.contains(p)));
        }
    }

    #[test]
    fn looking_at_puts_center_on_axis() {
        let center = Pt3::new(4.0, -2.5, 0.0);
        let pose = looking_at(&center, 15.0, Vec3::zeros(), (0.0, 0.0));
        let pc = pose.transform_point(&center);
        assert!((pc.coords - Vec3::new(0.0, 0.0, 15.0)).norm() < 1e-12);
    }
}
