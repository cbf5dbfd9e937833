//! Observation types for calibration and tracking.
//!
//! An [`ObservationSet`] holds the ordered 2D-3D correspondences extracted
//! from one image.

use crate::{Pt2, Pt3, Real};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// One image's ordered target-to-pixel correspondences.
///
/// # Example
///
/// ```
/// use arcam_core::{ObservationSet, Pt3, Pt2};
///
/// let points_3d = vec![Pt3::new(0.0, 0.0, 0.0), Pt3::new(1.0, 0.0, 0.0)];
/// let points_2d = vec![Pt2::new(320.0, 240.0), Pt2::new(400.0, 240.0)];
/// let obs = ObservationSet::new(points_3d, points_2d).unwrap();
///
/// assert_eq!(obs.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    /// Points in the target frame.
    pub points_3d: Vec<Pt3>,
    /// Corresponding pixel observations.
    pub points_2d: Vec<Pt2>,
}

impl ObservationSet {
    /// # Errors
    ///
    /// Returns an error if the 3D and 2D point counts don't match.
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Result<Self> {
        ensure!(
            points_3d.len() == points_2d.len(),
            "3D / 2D point counts must match: {} vs {}",
            points_3d.len(),
            points_2d.len()
        );
        Ok(Self {
            points_3d,
            points_2d,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }

    /// Iterate `(target point, pixel)` pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&Pt3, &Pt2)> {
        self.points_3d.iter().zip(self.points_2d.iter())
    }

    /// Index of the first pair with a NaN or infinite coordinate.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.pairs().position(|(pw, px)| {
            !(pw.coords.iter().all(|v| v.is_finite()) && px.coords.iter().all(|v| v.is_finite()))
        })
    }

    /// Target points dropped onto their `(x, y)` coordinates.
    pub fn planar_points(&self) -> Vec<Pt2> {
        self.points_3d
            .iter()
            .map(|p3| Pt2::new(p3.x, p3.y))
            .collect()
    }

    /// True when every target point satisfies `|z| <= tol`.
    pub fn is_on_z0_plane(&self, tol: Real) -> bool {
        self.points_3d.iter().all(|p| p.z.abs() <= tol)
    }
}

/// Summary statistics of pixel reprojection errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionStats {
    pub mean: Real,
    pub rms: Real,
    pub max: Real,
    pub count: usize,
}

impl ReprojectionStats {
    pub fn from_errors(errors: &[Real]) -> Self {
        if errors.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                max: 0.0,
                count: 0,
            };
        }
        let n = errors.len() as Real;
        let sum: Real = errors.iter().sum();
        let sum_sq: Real = errors.iter().map(|e| e * e).sum();
        let max = errors.iter().copied().fold(0.0, Real::max);
        Self {
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
            max,
            count: errors.len(),
        }
    }
}
