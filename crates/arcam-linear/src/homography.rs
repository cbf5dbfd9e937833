use arcam_core::{Mat3, Pt2, Real};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("source and destination counts differ ({0} vs {1})")]
    CountMismatch(usize, usize),
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Similarity transform moving the centroid to the origin with mean
/// distance `√2` (Hartley normalization).
fn normalization(points: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = points.len() as Real;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n, sy / n);
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<Real>()
        / n;
    if mean_dist <= Real::EPSILON {
        return Err(HomographyError::Degenerate);
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Ok(Mat3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

fn apply(t: &Mat3, p: &Pt2) -> Pt2 {
    Pt2::new(
        t[(0, 0)] * p.x + t[(0, 2)],
        t[(1, 1)] * p.y + t[(1, 2)],
    )
}

/// Estimate `H` such that `image ~ H · world` using the normalized DLT.
///
/// `H` is scaled so that `H[2,2] = 1` when that entry is not vanishing.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if image.len() != n {
        return Err(HomographyError::CountMismatch(n, image.len()));
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let t_world = normalization(world)?;
    let t_image = normalization(image)?;

    // Pad to at least 9 rows so the thin SVD still exposes the null vector.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<Real>::zeros(rows, 9);

    for (i, (pw, pi)) in world.iter().zip(image.iter()).enumerate() {
        let w = apply(&t_world, pw);
        let m = apply(&t_image, pi);
        let (x, y, u, v) = (w.x, w.y, m.x, m.y);

        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));
    let smallest = order[0];
    let largest = svd.singular_values[order[order.len() - 1]];
    // a second (near) null vector means the points do not pin down H
    if svd.singular_values[order[1]] <= 1e-10 * largest {
        return Err(HomographyError::Degenerate);
    }
    let h = v_t.row(smallest);

    let mut h_norm = Mat3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h_norm[(r, c)] = h[3 * r + c];
        }
    }

    let t_image_inv = t_image.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut h_mat = t_image_inv * h_norm * t_world;

    let scale = h_mat[(2, 2)];
    if scale.abs() > Real::EPSILON {
        h_mat /= scale;
    } else {
        let norm = h_mat.norm();
        if norm <= Real::EPSILON {
            return Err(HomographyError::Degenerate);
        }
        h_mat /= norm;
    }
    if h_mat.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::Degenerate);
    }

    Ok(h_mat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcam_core::{from_homogeneous, to_homogeneous};

    #[test]
    fn basic_homography() {
        let w = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(1.0, 0.0),
            Pt2::new(1.0, 1.0),
            Pt2::new(0.0, 1.0),
        ];
        let img = vec![
            Pt2::new(0.0, 0.0),
            Pt2::new(2.0, 0.0),
            Pt2::new(2.0, 2.0),
            Pt2::new(0.0, 2.0),
        ];

        let h = dlt_homography(&w, &img).unwrap();
        assert!((h[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((h[(1, 1)] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn recovers_projective_map_on_pixel_scale() {
        let h_gt = Mat3::new(
            820.0, 35.0, 300.0, //
            -20.0, 790.0, 240.0, //
            0.02, -0.01, 1.0,
        );
        let world: Vec<Pt2> = (0..6)
            .flat_map(|i| (0..9).map(move |j| Pt2::new(j as Real * 0.1, -(i as Real) * 0.1)))
            .collect();
        let image: Vec<Pt2> = world
            .iter()
            .map(|p| from_homogeneous(&(h_gt * to_homogeneous(p))))
            .collect();

        let h = dlt_homography(&world, &image).unwrap();
        for (pw, pi) in world.iter().zip(&image) {
            let mapped = from_homogeneous(&(h * to_homogeneous(pw)));
            assert!((mapped - pi).norm() < 1e-6);
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        let three = vec![Pt2::new(0.0, 0.0); 3];
        assert_eq!(
            dlt_homography(&three, &three),
            Err(HomographyError::NotEnoughPoints(3))
        );

        let collinear: Vec<Pt2> = (0..5).map(|i| Pt2::new(i as Real, 0.0)).collect();
        assert_eq!(
            dlt_homography(&collinear, &collinear),
            Err(HomographyError::Degenerate)
        );

        let four = vec![Pt2::new(0.0, 0.0); 4];
        assert_eq!(
            dlt_homography(&four, &three),
            Err(HomographyError::CountMismatch(4, 3))
        );
    }
}
