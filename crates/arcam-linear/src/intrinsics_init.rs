//! Focal-length seed from plane homographies.
//!
//! With the principal point fixed at the image centre and zero skew, the
//! image of the absolute conic reduces to `B = diag(1/fx², 1/fy², 1)` and
//! every homography contributes two equations linear in `(1/fx², 1/fy²)`:
//! `h1ᵀ B h2 = 0` and `h1ᵀ B h1 = h2ᵀ B h2`.

use arcam_core::{ImageSize, Mat3, Real};
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Smallest accepted ratio between the two singular values of the system.
const MIN_SYSTEM_RCOND: Real = 1e-6;

/// Focal lengths used to start calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalInit {
    pub fx: Real,
    pub fy: Real,
    /// `true` when the homographies did not constrain the focal lengths and
    /// `fx = fy = max(width, height)` was used instead.
    pub fallback: bool,
}

impl FocalInit {
    fn fallback(size: &ImageSize) -> Self {
        let f = size.max_side();
        Self {
            fx: f,
            fy: f,
            fallback: true,
        }
    }
}

/// Estimate `(fx, fy)` from plane-to-pixel homographies.
///
/// Falls back to `max(width, height)` for both focal lengths when the
/// linear system is rank deficient (e.g. all views fronto-parallel) or its
/// solution is not positive.
pub fn estimate_focal_from_homographies(homographies: &[Mat3], size: &ImageSize) -> FocalInit {
    let c = size.center();
    let shift = Mat3::new(1.0, 0.0, -c.x, 0.0, 1.0, -c.y, 0.0, 0.0, 1.0);

    let m = homographies.len();
    if m == 0 {
        return FocalInit::fallback(size);
    }
    let mut a = DMatrix::<Real>::zeros(2 * m, 2);
    let mut b = DVector::<Real>::zeros(2 * m);

    for (i, h) in homographies.iter().enumerate() {
        let hc = shift * h;
        let norm = hc.norm();
        if !norm.is_finite() || norm <= 0.0 {
            return FocalInit::fallback(size);
        }
        let hc = hc / norm;
        let (h00, h10, h20) = (hc[(0, 0)], hc[(1, 0)], hc[(2, 0)]);
        let (h01, h11, h21) = (hc[(0, 1)], hc[(1, 1)], hc[(2, 1)]);

        a[(2 * i, 0)] = h00 * h01;
        a[(2 * i, 1)] = h10 * h11;
        b[2 * i] = -h20 * h21;

        a[(2 * i + 1, 0)] = h00 * h00 - h01 * h01;
        a[(2 * i + 1, 1)] = h10 * h10 - h11 * h11;
        b[2 * i + 1] = -(h20 * h20 - h21 * h21);
    }

    let svd = a.svd(true, true);
    let (s_min, s_max) = svd
        .singular_values
        .iter()
        .fold((Real::INFINITY, 0.0_f64), |(lo, hi), s| (lo.min(*s), hi.max(*s)));
    if s_max <= 0.0 || s_min / s_max < MIN_SYSTEM_RCOND {
        debug!("focal seed: rank-deficient system (s_min={s_min:e}, s_max={s_max:e})");
        return FocalInit::fallback(size);
    }
    let sol = match svd.solve(&b, Real::EPSILON) {
        Ok(sol) => sol,
        Err(_) => return FocalInit::fallback(size),
    };
    let (inv_fx2, inv_fy2) = (sol[0], sol[1]);
    if inv_fx2.is_nan() || inv_fy2.is_nan() || inv_fx2 <= 0.0 || inv_fy2 <= 0.0 {
        debug!("focal seed: non-positive solution ({inv_fx2:e}, {inv_fy2:e})");
        return FocalInit::fallback(size);
    }
    let (fx, fy) = (inv_fx2.sqrt().recip(), inv_fy2.sqrt().recip());
    if !(fx.is_finite() && fy.is_finite()) {
        return FocalInit::fallback(size);
    }
    FocalInit {
        fx,
        fy,
        fallback: false,
    }
}
