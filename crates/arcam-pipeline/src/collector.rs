//! Accumulation of calibration correspondences.
//!
//! The collector owns the session's accepted [`ObservationSet`]s. Detection
//! and I/O happen elsewhere; the collector only validates detector output
//! against the known grid and pairs it with the precomputed target table.

use arcam_core::{ObservationSet, Pt2, Pt3, Real};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inner-corner grid of a checkerboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridSize {
    /// 9 × 6 inner corners: 9 columns, 6 rows.
    fn default() -> Self {
        Self { rows: 6, cols: 9 }
    }
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why detector output was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Rejected {
    #[error("expected {expected} corners, detector returned {found}")]
    GridMismatch { expected: usize, found: usize },
    #[error("corner {index} is not finite")]
    NonFinite { index: usize },
}

/// Canonical target points for `grid`: cell `(i, j)` maps to
/// `(j * square, -i * square, 0)`, row-major.
pub fn target_points(grid: GridSize, square_size: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(grid.len());
    for i in 0..grid.rows {
        for j in 0..grid.cols {
            points.push(Pt3::new(
                j as Real * square_size,
                -(i as Real) * square_size,
                0.0,
            ));
        }
    }
    points
}

/// Append-only collection of checkerboard observations.
#[derive(Debug, Clone)]
pub struct CornerObservationCollector {
    grid: GridSize,
    target: Vec<Pt3>,
    observations: Vec<ObservationSet>,
}

impl CornerObservationCollector {
    pub fn new(grid: GridSize, square_size: Real) -> Self {
        Self {
            grid,
            target: target_points(grid, square_size),
            observations: Vec::new(),
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// The precomputed target table, row-major.
    pub fn target_points(&self) -> &[Pt3] {
        &self.target
    }

    /// Pair detector output with the target table without recording it.
    pub fn pair(&self, detected: &[Pt2]) -> Result<ObservationSet, Rejected> {
        if detected.len() != self.target.len() {
            return Err(Rejected::GridMismatch {
                expected: self.target.len(),
                found: detected.len(),
            });
        }
        if let Some(index) = detected
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(Rejected::NonFinite { index });
        }
        Ok(ObservationSet {
            points_3d: self.target.clone(),
            points_2d: detected.to_vec(),
        })
    }

    /// Validate and record one image's corners (detector order, row-major).
    /// Returns the number of observations held after the append.
    pub fn accept(&mut self, detected: &[Pt2]) -> Result<usize, Rejected> {
        let set = self.pair(detected)?;
        self.observations.push(set);
        let count = self.observations.len();
        debug!("accepted observation #{count}");
        Ok(count)
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }

    pub fn all(&self) -> &[ObservationSet] {
        &self.observations
    }

    /// Copy of the observations taken so far, safe to hand to the estimator
    /// while collection continues.
    pub fn snapshot(&self) -> Vec<ObservationSet> {
        self.observations.clone()
    }

    /// Close the collection for writing.
    pub fn into_observations(self) -> Vec<ObservationSet> {
        self.observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners(n: usize) -> Vec<Pt2> {
        (0..n).map(|k| Pt2::new(k as Real, 2.0 * k as Real)).collect()
    }

    #[test]
    fn table_follows_row_major_negative_rows() {
        let c = CornerObservationCollector::new(GridSize::default(), 1.0);
        let t = c.target_points();
        assert_eq!(t.len(), 54);
        assert_eq!(t[0], Pt3::new(0.0, 0.0, 0.0));
        assert_eq!(t[8], Pt3::new(8.0, 0.0, 0.0));
        assert_eq!(t[9], Pt3::new(0.0, -1.0, 0.0));
        assert_eq!(t[53], Pt3::new(8.0, -5.0, 0.0));
    }

    #[test]
    fn grid_mismatch_is_rejected_for_any_grid() {
        for (rows, cols) in [(6, 9), (1, 1), (4, 5), (7, 3)] {
            let mut c = CornerObservationCollector::new(GridSize::new(rows, cols), 1.0);
            let n = rows * cols;
            for bad in [n.saturating_sub(1), n + 1, 0] {
                if bad == n {
                    continue;
                }
                assert_eq!(
                    c.accept(&corners(bad)).unwrap_err(),
                    Rejected::GridMismatch {
                        expected: n,
                        found: bad
                    }
                );
            }
            assert_eq!(c.count(), 0);
            c.accept(&corners(n)).unwrap();
            assert_eq!(c.count(), 1);
        }
    }

    #[test]
    fn nine_by_six_rejects_53_and_55() {
        let mut c = CornerObservationCollector::new(GridSize::default(), 1.0);
        assert!(c.accept(&corners(53)).is_err());
        assert!(c.accept(&corners(55)).is_err());
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn accepted_sets_pair_in_order_and_accumulate() {
        let mut c = CornerObservationCollector::new(GridSize::new(2, 3), 0.5);
        let detected = corners(6);
        assert_eq!(c.accept(&detected).unwrap(), 1);
        let set = &c.all()[0];
        assert_eq!(set.points_2d, detected);
        assert_eq!(set.points_3d[4], Pt3::new(0.5, -0.5, 0.0));

        assert_eq!(c.accept(&corners(6)).unwrap(), 2);
        assert_eq!(c.count(), 2);
        assert_eq!(c.all().len(), 2);
        assert_eq!(c.snapshot(), c.all().to_vec());
        assert_eq!(c.into_observations().len(), 2);
    }

    #[test]
    fn non_finite_corners_are_rejected() {
        let mut c = CornerObservationCollector::new(GridSize::new(1, 3), 1.0);
        let mut detected = corners(3);
        detected[1].y = Real::NAN;
        assert_eq!(
            c.accept(&detected).unwrap_err(),
            Rejected::NonFinite { index: 1 }
        );
    }
}
