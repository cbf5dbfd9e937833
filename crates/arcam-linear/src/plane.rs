//! Shape analysis of target point sets.
//!
//! Pose initialization needs to know whether the target points are spread
//! in 3D, lie on a plane (and which one), or degenerate to a line.

use arcam_core::{centroid, Iso3, Mat3, Pt2, Pt3, Real, Vec3};
use nalgebra::{DMatrix, Rotation3, Translation3, UnitQuaternion};

/// Relative spread below which a direction counts as collapsed onto a line.
const COLLINEAR_TOL: Real = 1e-9;
/// Relative thickness below which points count as coplanar.
const PLANAR_TOL: Real = 1e-6;

/// Orthonormal frame whose `z = 0` plane contains the target points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFrame {
    /// Plane origin in target coordinates.
    pub origin: Pt3,
    /// Columns are the in-plane axes and the plane normal (a rotation).
    pub axes: Mat3,
}

impl PlaneFrame {
    /// Frame of the target's own `z = 0` plane.
    pub fn target_z0() -> Self {
        Self {
            origin: Pt3::origin(),
            axes: Mat3::identity(),
        }
    }

    /// In-plane coordinates of a target point.
    pub fn to_plane(&self, p: &Pt3) -> Pt2 {
        let d = p - self.origin;
        Pt2::new(self.axes.column(0).dot(&d), self.axes.column(1).dot(&d))
    }

    /// Transform from plane coordinates to target coordinates (`T_T_P`).
    pub fn plane_to_target(&self) -> Iso3 {
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.axes));
        Iso3::from_parts(Translation3::from(self.origin.coords), rot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointLayout {
    /// All points on one line (or one point).
    Collinear,
    /// All points on one plane.
    Planar(PlaneFrame),
    /// Points span three dimensions.
    General,
}

/// Classify a target point cloud by the singular values of its centred
/// coordinates.
pub fn analyze_points(points: &[Pt3]) -> PointLayout {
    let Some(c) = centroid(points) else {
        return PointLayout::Collinear;
    };
    if points.len() < 3 {
        return PointLayout::Collinear;
    }
    let centred = DMatrix::<Real>::from_fn(points.len(), 3, |r, k| points[r][k] - c[k]);

    let svd = centred.svd(false, true);
    let Some(v_t) = svd.v_t else {
        return PointLayout::Collinear;
    };
    let mut order = [0usize, 1, 2];
    order.sort_by(|&i, &j| svd.singular_values[j].total_cmp(&svd.singular_values[i]));
    let (s0, s1, s2) = (
        svd.singular_values[order[0]],
        svd.singular_values[order[1]],
        svd.singular_values[order[2]],
    );

    if s0 <= Real::EPSILON || s1 <= COLLINEAR_TOL * s0 {
        return PointLayout::Collinear;
    }
    if s2 > PLANAR_TOL * s0 {
        return PointLayout::General;
    }

    let extent = points
        .iter()
        .map(|p| (p - c).norm())
        .fold(0.0, Real::max);
    if points.iter().all(|p| p.z.abs() <= PLANAR_TOL * extent) {
        return PointLayout::Planar(PlaneFrame::target_z0());
    }

    let axis = |k: usize| Vec3::new(v_t[(k, 0)], v_t[(k, 1)], v_t[(k, 2)]);
    let e0 = axis(order[0]).normalize();
    let n = e0.cross(&axis(order[1])).normalize();
    let e1 = n.cross(&e0);
    PointLayout::Planar(PlaneFrame {
        origin: c,
        axes: Mat3::from_columns(&[e0, e1, n]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z0_grid_uses_the_target_frame() {
        let pts: Vec<Pt3> = (0..3)
            .flat_map(|i| (0..4).map(move |j| Pt3::new(j as Real, -(i as Real), 0.0)))
            .collect();
        assert_eq!(
            analyze_points(&pts),
            PointLayout::Planar(PlaneFrame::target_z0())
        );
    }

    #[test]
    fn tilted_plane_round_trips_through_its_frame() {
        let rot = Rotation3::from_euler_angles(0.4, -0.3, 1.0);
        let offset = Vec3::new(1.0, 2.0, -3.0);
        let pts: Vec<Pt3> = [(0.0, 0.0), (1.0, 0.0), (0.0, 2.0), (1.5, 1.0), (-1.0, 0.5)]
            .iter()
            .map(|&(x, y)| Pt3::from(rot * Vec3::new(x, y, 0.0) + offset))
            .collect();

        let PointLayout::Planar(frame) = analyze_points(&pts) else {
            panic!("expected a plane");
        };
        let to_target = frame.plane_to_target();
        for p in &pts {
            let q = frame.to_plane(p);
            let back = to_target.transform_point(&Pt3::new(q.x, q.y, 0.0));
            assert!((back - p).norm() < 1e-9);
        }
    }

    #[test]
    fn detects_lines_and_volumes() {
        let line: Vec<Pt3> = (0..5).map(|i| Pt3::new(i as Real, 2.0 * i as Real, 1.0)).collect();
        assert_eq!(analyze_points(&line), PointLayout::Collinear);
        assert_eq!(analyze_points(&[]), PointLayout::Collinear);

        let cube = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(1.0, 0.0, 0.0),
            Pt3::new(0.0, 1.0, 0.0),
            Pt3::new(0.0, 0.0, 1.0),
            Pt3::new(1.0, 1.0, 1.0),
        ];
        assert_eq!(analyze_points(&cube), PointLayout::General);
    }
}
