use crate::{Mat2, Real, Vec2};
use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-point iterations used by [`BrownConrady5::undistort`].
const UNDISTORT_ITERS: usize = 20;

/// Jacobian of the distorted point with respect to `(k1, k2, p1, p2, k3)`.
pub type DistortionCoeffJacobian = SMatrix<Real, 2, 5>;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DistortionError {
    #[error("expected 4, 5 or 8 distortion coefficients, got {0}")]
    BadLength(usize),
    #[error("rational distortion terms are not supported (k4={k4}, k5={k5}, k6={k6})")]
    UnsupportedRational { k4: Real, k5: Real, k6: Real },
    #[error("distortion coefficient {index} is not finite")]
    NonFinite { index: usize },
}

/// Brown-Conrady lens distortion with three radial and two tangential terms.
///
/// Coefficients are stored and exchanged in OpenCV order
/// `(k1, k2, p1, p2, k3)`. All zeros is the ideal pinhole.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub p1: Real,
    pub p2: Real,
    pub k3: Real,
}

impl BrownConrady5 {
    /// Build from an OpenCV-style coefficient vector.
    ///
    /// Four values imply `k3 = 0`. Eight values follow the rational layout
    /// `(k1, k2, p1, p2, k3, k4, k5, k6)` and are accepted only when the
    /// rational terms are zero, since the model cannot represent them.
    pub fn from_coeffs(coeffs: &[Real]) -> Result<Self, DistortionError> {
        if let Some(index) = coeffs.iter().position(|c| !c.is_finite()) {
            return Err(DistortionError::NonFinite { index });
        }
        match coeffs.len() {
            4 => Ok(Self {
                k1: coeffs[0],
                k2: coeffs[1],
                p1: coeffs[2],
                p2: coeffs[3],
                k3: 0.0,
            }),
            5 => Ok(Self::from_array([
                coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4],
            ])),
            8 => {
                let (k4, k5, k6) = (coeffs[5], coeffs[6], coeffs[7]);
                if k4 != 0.0 || k5 != 0.0 || k6 != 0.0 {
                    return Err(DistortionError::UnsupportedRational { k4, k5, k6 });
                }
                Ok(Self::from_array([
                    coeffs[0], coeffs[1], coeffs[2], coeffs[3], coeffs[4],
                ]))
            }
            n => Err(DistortionError::BadLength(n)),
        }
    }

    pub fn from_array(c: [Real; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    /// Coefficients in OpenCV order `(k1, k2, p1, p2, k3)`.
    pub fn coeffs(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs().iter().all(|c| *c == 0.0)
    }

    fn radial(&self, r2: Real) -> Real {
        1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3))
    }

    fn tangential(&self, x: Real, y: Real, r2: Real) -> (Real, Real) {
        (
            2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y,
        )
    }

    /// Apply distortion to undistorted normalized coordinates.
    pub fn distort(&self, n: &Vec2) -> Vec2 {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = self.radial(r2);
        let (tx, ty) = self.tangential(x, y, r2);
        Vec2::new(x * radial + tx, y * radial + ty)
    }

    /// Distort and return the Jacobians with respect to the normalized point
    /// and to the coefficients `(k1, k2, p1, p2, k3)`.
    pub fn distort_with_jacobians(&self, n: &Vec2) -> (Vec2, Mat2, DistortionCoeffJacobian) {
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = self.radial(r2);
        let (tx, ty) = self.tangential(x, y, r2);
        let distorted = Vec2::new(x * radial + tx, y * radial + ty);

        // d(radial)/d(r2)
        let dr = self.k1 + 2.0 * self.k2 * r2 + 3.0 * self.k3 * r4;
        let xy = x * y;
        let d_point = Mat2::new(
            radial + 2.0 * x * x * dr + 2.0 * self.p1 * y + 6.0 * self.p2 * x,
            2.0 * xy * dr + 2.0 * self.p1 * x + 2.0 * self.p2 * y,
            2.0 * xy * dr + 2.0 * self.p1 * x + 2.0 * self.p2 * y,
            radial + 2.0 * y * y * dr + 6.0 * self.p1 * y + 2.0 * self.p2 * x,
        );
        let d_coeffs = DistortionCoeffJacobian::new(
            x * r2,
            x * r4,
            2.0 * xy,
            r2 + 2.0 * x * x,
            x * r6,
            y * r2,
            y * r4,
            r2 + 2.0 * y * y,
            2.0 * xy,
            y * r6,
        );
        (distorted, d_point, d_coeffs)
    }

    /// Invert [`Self::distort`] by fixed-point iteration.
    pub fn undistort(&self, d: &Vec2) -> Vec2 {
        if self.is_zero() {
            return *d;
        }
        let mut x = d.x;
        let mut y = d.y;
        for _ in 0..UNDISTORT_ITERS {
            let r2 = x * x + y * y;
            let radial = self.radial(r2);
            if radial.abs() < Real::EPSILON {
                break;
            }
            let (tx, ty) = self.tangential(x, y, r2);
            x = (d.x - tx) / radial;
            y = (d.y - ty) / radial;
        }
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BrownConrady5 {
        BrownConrady5 {
            k1: -0.21,
            k2: 0.05,
            p1: 0.001,
            p2: -0.0015,
            k3: -0.01,
        }
    }

    #[test]
    fn zero_model_is_identity() {
        let n = Vec2::new(0.3, -0.2);
        assert_eq!(BrownConrady5::default().distort(&n), n);
    }

    #[test]
    fn undistort_inverts_distort() {
        let d = sample();
        let n = Vec2::new(0.25, -0.18);
        let back = d.undistort(&d.distort(&n));
        assert!((back - n).norm() < 1e-10, "{back:?}");
    }

    #[test]
    fn analytic_jacobians_match_finite_differences() {
        let d = sample();
        let n = Vec2::new(0.31, -0.12);
        let (_, jp, jc) = d.distort_with_jacobians(&n);
        let h = 1e-7;

        for axis in 0..2 {
            let mut plus = n;
            let mut minus = n;
            plus[axis] += h;
            minus[axis] -= h;
            let fd = (d.distort(&plus) - d.distort(&minus)) / (2.0 * h);
            assert!((fd - jp.column(axis)).norm() < 1e-6, "axis {axis}");
        }

        let base = d.coeffs();
        for k in 0..5 {
            let mut plus = base;
            let mut minus = base;
            plus[k] += h;
            minus[k] -= h;
            let fd = (BrownConrady5::from_array(plus).distort(&n)
                - BrownConrady5::from_array(minus).distort(&n))
                / (2.0 * h);
            assert!((fd - jc.column(k)).norm() < 1e-6, "coeff {k}");
        }
    }

    #[test]
    fn coefficient_vectors_of_supported_lengths() {
        let four = BrownConrady5::from_coeffs(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(four.k3, 0.0);
        assert_eq!(four.p2, 0.4);

        let eight =
            BrownConrady5::from_coeffs(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(eight.coeffs(), [0.1, 0.2, 0.3, 0.4, 0.5]);

        assert!(matches!(
            BrownConrady5::from_coeffs(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.01, 0.0, 0.0]),
            Err(DistortionError::UnsupportedRational { .. })
        ));
        assert_eq!(
            BrownConrady5::from_coeffs(&[0.1; 6]),
            Err(DistortionError::BadLength(6))
        );
    }
}
