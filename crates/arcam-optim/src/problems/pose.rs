//! Single-view pose refinement with a fixed camera.

use super::AnchoredPose;
use crate::factors::{reprojection_residual, reprojection_term, POSE_DIM};
use crate::traits::{NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport};
use arcam_core::{ObservationSet, PinholeCamera, Pose, Real};
use nalgebra::{DMatrix, DVector, Vector2};

/// Six-parameter problem `[ω, t]` anchored at the initial rotation.
#[derive(Debug, Clone, Copy)]
pub struct PoseProblem<'a> {
    observation: &'a ObservationSet,
    camera: &'a PinholeCamera,
    block: AnchoredPose,
}

impl<'a> PoseProblem<'a> {
    pub fn new(observation: &'a ObservationSet, camera: &'a PinholeCamera, initial: &Pose) -> Self {
        Self {
            observation,
            camera,
            block: AnchoredPose::new(initial),
        }
    }

    pub fn pack(&self, pose: &Pose) -> DVector<Real> {
        let mut x = DVector::zeros(POSE_DIM);
        self.block.pack(pose, x.as_mut_slice());
        x
    }

    pub fn unpack(&self, x: &DVector<Real>) -> Pose {
        self.block.unpack(x.rows(0, POSE_DIM))
    }
}

impl NllsProblem for PoseProblem<'_> {
    fn num_params(&self) -> usize {
        POSE_DIM
    }

    fn num_residuals(&self) -> usize {
        2 * self.observation.len()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let pose = self.unpack(x);
        let mut r = DVector::zeros(self.num_residuals());
        for (i, (pw, px)) in self.observation.pairs().enumerate() {
            let e = reprojection_residual(self.camera, &pose.0, pw, px)
                .unwrap_or_else(|| Vector2::repeat(Real::NAN));
            r[2 * i] = e.x;
            r[2 * i + 1] = e.y;
        }
        r
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let pose = self.unpack(x);
        let mut j = DMatrix::zeros(self.num_residuals(), POSE_DIM);
        for (i, (pw, px)) in self.observation.pairs().enumerate() {
            if let Some(term) = reprojection_term(self.camera, &pose.0, pw, px) {
                j.fixed_view_mut::<2, POSE_DIM>(2 * i, 0)
                    .copy_from(&self.block.chain(x.rows(0, POSE_DIM), &term.d_pose));
            }
        }
        j
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PoseRefinement {
    pub pose: Pose,
    pub report: SolveReport,
}

/// Refine `initial` against `observation` with the camera held fixed.
pub fn refine_pose<B: NllsSolverBackend>(
    backend: &B,
    observation: &ObservationSet,
    camera: &PinholeCamera,
    initial: &Pose,
    opts: &SolveOptions,
) -> Result<PoseRefinement, SolveError> {
    let problem = PoseProblem::new(observation, camera, initial);
    let (x, report) = backend.solve(&problem, problem.pack(initial), opts)?;
    Ok(PoseRefinement {
        pose: problem.unpack(&x),
        report,
    })
}
