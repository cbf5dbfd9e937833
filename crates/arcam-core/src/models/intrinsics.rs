use crate::{Mat3, Pt2, Real, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for entries of `K` that must vanish (skew, lower triangle).
const K_ZERO_TOL: Real = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum IntrinsicsError {
    #[error("focal lengths must be positive and finite (fx={fx}, fy={fy})")]
    InvalidFocal { fx: Real, fy: Real },
    #[error("principal point must be finite (cx={cx}, cy={cy})")]
    InvalidPrincipalPoint { cx: Real, cy: Real },
    #[error("camera matrix has non-zero skew {0}")]
    NonZeroSkew(Real),
    #[error("camera matrix is not upper triangular")]
    NotUpperTriangular,
    #[error("camera matrix bottom-right entry must be 1, got {0}")]
    BadScale(Real),
}

/// Zero-skew pinhole intrinsics.
///
/// `K = [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: Real,
    pub fy: Real,
    pub cx: Real,
    pub cy: Real,
}

impl Intrinsics {
    /// Validated constructor.
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Result<Self, IntrinsicsError> {
        let k = Self { fx, fy, cx, cy };
        k.validate()?;
        Ok(k)
    }

    /// Check `fx, fy > 0` and that every entry is finite.
    pub fn validate(&self) -> Result<(), IntrinsicsError> {
        if !(self.fx.is_finite() && self.fy.is_finite() && self.fx > 0.0 && self.fy > 0.0) {
            return Err(IntrinsicsError::InvalidFocal {
                fx: self.fx,
                fy: self.fy,
            });
        }
        if !(self.cx.is_finite() && self.cy.is_finite()) {
            return Err(IntrinsicsError::InvalidPrincipalPoint {
                cx: self.cx,
                cy: self.cy,
            });
        }
        Ok(())
    }

    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Interpret a full 3×3 camera matrix.
    ///
    /// The matrix must be upper triangular with zero skew and a unit
    /// bottom-right entry; anything else is reported instead of being
    /// silently projected onto the model.
    pub fn try_from_k_matrix(k: &Mat3) -> Result<Self, IntrinsicsError> {
        let scale = k[(2, 2)];
        if !scale.is_finite() || (scale - 1.0).abs() > K_ZERO_TOL {
            return Err(IntrinsicsError::BadScale(scale));
        }
        for &(r, c) in &[(1, 0), (2, 0), (2, 1)] {
            if k[(r, c)].abs() > K_ZERO_TOL {
                return Err(IntrinsicsError::NotUpperTriangular);
            }
        }
        let skew = k[(0, 1)];
        if skew.abs() > K_ZERO_TOL * k[(0, 0)].abs().max(1.0) {
            return Err(IntrinsicsError::NonZeroSkew(skew));
        }
        Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)])
    }

    /// Map normalized image coordinates to pixels.
    #[inline]
    pub fn normalized_to_pixel(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Map pixels to normalized image coordinates.
    #[inline]
    pub fn pixel_to_normalized(&self, p: &Pt2) -> Vec2 {
        Vec2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }
}
