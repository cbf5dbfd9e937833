//! Joint refinement of intrinsics, distortion and per-view poses.
//!
//! Parameter vector: the camera block `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`
//! followed by one `[ω, t]` block per view, anchored at that view's initial
//! rotation. Residuals are the pixel differences of every correspondence,
//! two rows per point.

use super::{pack_camera, unpack_camera, AnchoredPose};
use crate::conditioning::marginal_rcond;
use crate::factors::{reprojection_residual, reprojection_term, CAMERA_DIM, POSE_DIM};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport};
use arcam_core::{ObservationSet, PinholeCamera, Pose, Real};
use nalgebra::{DMatrix, DVector};

/// Borrowed calibration problem over a fixed set of views.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem<'a> {
    views: &'a [ObservationSet],
    blocks: Vec<AnchoredPose>,
    num_residuals: usize,
}

impl<'a> PlanarIntrinsicsProblem<'a> {
    /// `anchors` holds one pose per view; their rotations anchor the pose blocks.
    pub fn new(views: &'a [ObservationSet], anchors: &[Pose]) -> Self {
        debug_assert_eq!(anchors.len(), views.len());
        let num_residuals = views.iter().map(|v| 2 * v.len()).sum();
        Self {
            views,
            blocks: anchors.iter().map(AnchoredPose::new).collect(),
            num_residuals,
        }
    }

    fn pose_offset(view: usize) -> usize {
        CAMERA_DIM + POSE_DIM * view
    }

    /// Pack an initial guess into a parameter vector.
    pub fn pack(&self, camera: &PinholeCamera, poses: &[Pose]) -> DVector<Real> {
        debug_assert_eq!(poses.len(), self.blocks.len());
        let mut x = DVector::zeros(self.num_params());
        pack_camera(camera, &mut x.as_mut_slice()[..CAMERA_DIM]);
        for (i, (block, pose)) in self.blocks.iter().zip(poses).enumerate() {
            let o = Self::pose_offset(i);
            block.pack(pose, &mut x.as_mut_slice()[o..o + POSE_DIM]);
        }
        x
    }

    /// Decode a parameter vector into the camera and per-view poses.
    pub fn unpack(&self, x: &DVector<Real>) -> (PinholeCamera, Vec<Pose>) {
        let camera = unpack_camera(x.rows(0, CAMERA_DIM));
        let poses = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| block.unpack(x.rows(Self::pose_offset(i), POSE_DIM)))
            .collect();
        (camera, poses)
    }
}

impl NllsProblem for PlanarIntrinsicsProblem<'_> {
    fn num_params(&self) -> usize {
        CAMERA_DIM + POSE_DIM * self.views.len()
    }

    fn num_residuals(&self) -> usize {
        self.num_residuals
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (camera, poses) = self.unpack(x);
        let mut r = DVector::zeros(self.num_residuals);
        let mut row = 0;
        for (view, pose) in self.views.iter().zip(&poses) {
            for (pw, px) in view.pairs() {
                // a point behind the camera poisons the cost so LM rejects the step
                let e = reprojection_residual(&camera, &pose.0, pw, px)
                    .unwrap_or_else(|| nalgebra::Vector2::repeat(Real::NAN));
                r[row] = e.x;
                r[row + 1] = e.y;
                row += 2;
            }
        }
        r
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let (camera, poses) = self.unpack(x);
        let mut j = DMatrix::zeros(self.num_residuals, self.num_params());
        let mut row = 0;
        for (i, (view, pose)) in self.views.iter().zip(&poses).enumerate() {
            let o = Self::pose_offset(i);
            let block = &self.blocks[i];
            for (pw, px) in view.pairs() {
                if let Some(term) = reprojection_term(&camera, &pose.0, pw, px) {
                    j.fixed_view_mut::<2, CAMERA_DIM>(row, 0)
                        .copy_from(&term.d_camera);
                    j.fixed_view_mut::<2, POSE_DIM>(row, o)
                        .copy_from(&block.chain(x.rows(o, POSE_DIM), &term.d_pose));
                }
                row += 2;
            }
        }
        j
    }
}

/// Output of [`refine_planar_intrinsics`].
#[derive(Debug, Clone)]
pub struct PlanarRefinement {
    pub camera: PinholeCamera,
    pub poses: Vec<Pose>,
    pub report: SolveReport,
    /// [`marginal_rcond`] of `[fx, fy, cx, cy]` at the solution, with
    /// distortion and poses eliminated.
    pub intrinsics_rcond: Real,
}

/// Jointly refine camera and poses starting from `camera` / `poses`.
pub fn refine_planar_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    views: &[ObservationSet],
    camera: &PinholeCamera,
    poses: &[Pose],
    opts: &SolveOptions,
) -> Result<PlanarRefinement, SolveError> {
    let problem = PlanarIntrinsicsProblem::new(views, poses);
    let x0 = problem.pack(camera, poses);
    let (x, report) = backend.solve(&problem, x0, opts)?;
    let jac = problem.jacobian(&x);
    let intrinsics_rcond = marginal_rcond(&(jac.transpose() * &jac), 4);
    let (camera, poses) = problem.unpack(&x);
    Ok(PlanarRefinement {
        camera,
        poses,
        report,
        intrinsics_rcond,
    })
}
