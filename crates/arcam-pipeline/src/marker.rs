//! Square fiducial markers as pose targets.

use arcam_core::{ObservationSet, Pt2, Pt3, Real};
use serde::{Deserialize, Serialize};

/// One detected marker: its dictionary id and image corners ordered
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    pub corners: [Pt2; 4],
}

/// Marker corners in the marker frame, centred at the origin on z = 0, in
/// detection order.
pub fn marker_corners(side: Real) -> [Pt3; 4] {
    let h = 0.5 * side;
    [
        Pt3::new(-h, h, 0.0),
        Pt3::new(h, h, 0.0),
        Pt3::new(h, -h, 0.0),
        Pt3::new(-h, -h, 0.0),
    ]
}

pub fn marker_observation(detection: &MarkerDetection, side: Real) -> ObservationSet {
    ObservationSet {
        points_3d: marker_corners(side).to_vec(),
        points_2d: detection.corners.to_vec(),
    }
}

/// First detection carrying `id`.
pub fn find_marker(detections: &[MarkerDetection], id: u32) -> Option<&MarkerDetection> {
    detections.iter().find(|d| d.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_detection_order() {
        let c = marker_corners(2.0);
        assert_eq!(c[0], Pt3::new(-1.0, 1.0, 0.0));
        assert_eq!(c[2], Pt3::new(1.0, -1.0, 0.0));
        let det = MarkerDetection {
            id: 7,
            corners: [
                Pt2::new(0.0, 0.0),
                Pt2::new(1.0, 0.0),
                Pt2::new(1.0, 1.0),
                Pt2::new(0.0, 1.0),
            ],
        };
        let obs = marker_observation(&det, 2.0);
        assert_eq!(obs.len(), 4);
        assert_eq!(obs.points_2d[1], Pt2::new(1.0, 0.0));
        assert!(obs.is_on_z0_plane(0.0));
    }

    #[test]
    fn find_by_id() {
        let mk = |id| MarkerDetection {
            id,
            corners: [Pt2::origin(); 4],
        };
        let dets = [mk(3), mk(23)];
        assert_eq!(find_marker(&dets, 23).map(|d| d.id), Some(23));
        assert!(find_marker(&dets, 5).is_none());
    }
}
