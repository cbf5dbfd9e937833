//! Conditioning checks on the Gauss-Newton normal matrix.

use arcam_core::Real;
use nalgebra::DMatrix;

/// Reciprocal condition number of `JᵀJ` after Jacobi (column) scaling.
///
/// Scaling removes the spread caused by parameter units (pixels versus
/// radians), so a small value means a genuine near-null direction: some
/// combination of parameters leaves every residual unchanged. Returns 0 for
/// an all-zero column.
pub fn scaled_rcond(jtj: &DMatrix<Real>) -> Real {
    let n = jtj.nrows();
    if n == 0 {
        return 1.0;
    }
    let mut d = Vec::with_capacity(n);
    for i in 0..n {
        let v = jtj[(i, i)];
        if !v.is_finite() || v <= 0.0 {
            return 0.0;
        }
        d.push(v.sqrt().recip());
    }
    let scaled = DMatrix::from_fn(n, n, |r, c| jtj[(r, c)] * d[r] * d[c]);
    let eig = scaled.symmetric_eigenvalues();
    let max = eig.iter().copied().fold(Real::NEG_INFINITY, Real::max);
    let min = eig.iter().copied().fold(Real::INFINITY, Real::min);
    if !(max.is_finite() && min.is_finite()) || max <= 0.0 {
        return 0.0;
    }
    (min / max).max(0.0)
}

/// Information share below which a parameter counts as fully absorbed by the
/// eliminated ones.
const ABSORBED_SHARE: Real = 1e-12;

/// [`scaled_rcond`] of the leading `keep × keep` block after the remaining
/// parameters are eliminated (Schur complement).
///
/// Measures how well the leading parameters are determined when every other
/// parameter is free to compensate. Returns 0 when the eliminated block is
/// itself singular, or when elimination leaves a parameter with a negligible
/// share of its own information.
pub fn marginal_rcond(jtj: &DMatrix<Real>, keep: usize) -> Real {
    let n = jtj.nrows();
    if keep >= n {
        return scaled_rcond(jtj);
    }
    let rest = n - keep;
    let Some(chol) = jtj.view((keep, keep), (rest, rest)).clone_owned().cholesky() else {
        return 0.0;
    };
    let a_kk = jtj.view((0, 0), (keep, keep)).clone_owned();
    let a_ko = jtj.view((0, keep), (keep, rest)).clone_owned();
    let a_ok = jtj.view((keep, 0), (rest, keep)).clone_owned();
    let schur = a_kk - a_ko * chol.solve(&a_ok);
    if (0..keep).any(|i| schur[(i, i)] <= ABSORBED_SHARE * jtj[(i, i)]) {
        return 0.0;
    }
    scaled_rcond(&schur)
}
