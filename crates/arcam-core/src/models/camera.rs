use crate::{BrownConrady5, Intrinsics, Pose, Pt2, Pt3, Real, Vec2};
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Geometric centre `((w - 1) / 2, (h - 1) / 2)` in pixel coordinates.
    pub fn center(&self) -> Pt2 {
        Pt2::new(
            (self.width as Real - 1.0) * 0.5,
            (self.height as Real - 1.0) * 0.5,
        )
    }

    pub fn max_side(&self) -> Real {
        self.width.max(self.height) as Real
    }

    pub fn contains(&self, p: &Pt2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as Real && p.y < self.height as Real
    }
}

/// Calibrated camera: intrinsics plus lens distortion.
///
/// Treated as immutable configuration once calibration is done; pose
/// estimation and projection borrow it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub intrinsics: Intrinsics,
    #[serde(default)]
    pub distortion: BrownConrady5,
}

impl PinholeCamera {
    pub fn new(intrinsics: Intrinsics, distortion: BrownConrady5) -> Self {
        Self {
            intrinsics,
            distortion,
        }
    }

    /// Camera without lens distortion.
    pub fn ideal(intrinsics: Intrinsics) -> Self {
        Self::new(intrinsics, BrownConrady5::default())
    }

    /// Project a camera-frame point to pixels.
    ///
    /// Returns `None` for points on or behind the image plane (`z <= 0`) and
    /// for non-finite results.
    pub fn project_point_c(&self, p_cam: &Pt3) -> Option<Pt2> {
        if p_cam.z.is_nan() || p_cam.z <= 0.0 {
            return None;
        }
        let n = Vec2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z);
        let px = self.intrinsics.normalized_to_pixel(&self.distortion.distort(&n));
        (px.x.is_finite() && px.y.is_finite()).then_some(px)
    }

    /// Project a target-frame point observed from `pose`.
    pub fn project_point(&self, pose: &Pose, p_world: &Pt3) -> Option<Pt2> {
        self.project_point_c(&pose.transform_point(p_world))
    }

    /// Pixel to undistorted normalized coordinates.
    pub fn undistort_pixel(&self, px: &Pt2) -> Vec2 {
        self.distortion
            .undistort(&self.intrinsics.pixel_to_normalized(px))
    }
}
