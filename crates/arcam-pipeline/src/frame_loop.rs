//! The per-frame AR loop.
//!
//! ```text
//! AwaitingFrame -> Detecting -> PoseFound -> Projecting -> Rendered -> AwaitingFrame
//!                           \-> DetectionFailed -> AwaitingFrame
//! any state -> Stopped (end of stream, quit signal, fatal error)
//! ```
//!
//! Frame acquisition, detection, drawing and user input are collaborators
//! behind traits; the loop owns the geometry. A frame without a usable pose
//! is not rendered and the loop moves on.

use crate::collector::{target_points, GridSize};
use crate::marker::{find_marker, marker_observation, MarkerDetection};
use crate::pose::{PoseError, PoseEstimator, PoseSolution};
use crate::pose_log::{PoseLog, PoseLogError};
use arcam_core::{
    project_points, ObservationSet, OverlayError, OverlayModel, PinholeCamera, Pose, Pt2, Pt3,
    Real, Rgb,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Produces frames until the stream ends (`Ok(None)`).
pub trait FrameSource {
    type Frame;

    fn next_frame(&mut self) -> anyhow::Result<Option<Self::Frame>>;
}

/// Checkerboard inner corners, row-major, or `None` when not found.
pub trait CornerDetector<F> {
    fn detect_corners(&mut self, frame: &F) -> Option<Vec<Pt2>>;
}

/// All square markers visible in the frame.
pub trait MarkerDetector<F> {
    fn detect_markers(&mut self, frame: &F) -> Vec<MarkerDetection>;
}

/// Locates the tracked target and pairs it with its model points.
pub trait TargetDetector<F> {
    fn detect(&mut self, frame: &F) -> Option<ObservationSet>;
}

/// Marker color for detected target points.
pub const DETECTION_COLOR: Rgb = [255, 128, 0];

/// Draw sink. A frame is opened with `begin_frame`, receives points and
/// segments and is committed as a whole.
pub trait Renderer<F> {
    fn begin_frame(&mut self, frame: F);
    fn draw_point(&mut self, p: Pt2, color: Rgb);
    fn draw_segment(&mut self, from: Pt2, to: Pt2, color: Rgb);
    fn commit_frame(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    Quit,
}

/// Polled once after every frame.
pub trait ControlInput {
    fn poll(&mut self) -> ControlSignal;
}

/// Never asks to quit; the loop runs to the end of the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunToEnd;

impl ControlInput for RunToEnd {
    fn poll(&mut self) -> ControlSignal {
        ControlSignal::Continue
    }
}

/// Which target the loop tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    Checkerboard,
    Marker { id: u32, side: Real },
}

/// Checkerboard target: corner detector output paired with the grid table.
#[derive(Debug, Clone)]
pub struct CheckerboardTarget<D> {
    detector: D,
    target: Vec<Pt3>,
}

impl<D> CheckerboardTarget<D> {
    pub fn new(detector: D, grid: GridSize, square_size: Real) -> Self {
        Self {
            detector,
            target: target_points(grid, square_size),
        }
    }
}

impl<F, D: CornerDetector<F>> TargetDetector<F> for CheckerboardTarget<D> {
    fn detect(&mut self, frame: &F) -> Option<ObservationSet> {
        let corners = self.detector.detect_corners(frame)?;
        if corners.len() != self.target.len() {
            debug!(
                "detector returned {} corners, grid has {}",
                corners.len(),
                self.target.len()
            );
            return None;
        }
        Some(ObservationSet {
            points_3d: self.target.clone(),
            points_2d: corners,
        })
    }
}

/// Single marker target, selected by id.
#[derive(Debug, Clone)]
pub struct MarkerTarget<D> {
    detector: D,
    id: u32,
    side: Real,
}

impl<D> MarkerTarget<D> {
    pub fn new(detector: D, id: u32, side: Real) -> Self {
        Self { detector, id, side }
    }
}

impl<F, D: MarkerDetector<F>> TargetDetector<F> for MarkerTarget<D> {
    fn detect(&mut self, frame: &F) -> Option<ObservationSet> {
        let markers = self.detector.detect_markers(frame);
        find_marker(&markers, self.id).map(|m| marker_observation(m, self.side))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingFrame,
    Detecting,
    PoseFound,
    Projecting,
    Rendered,
    DetectionFailed,
    Stopped,
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Rendered {
        pose: Pose,
        rms: Real,
        segments: usize,
        /// Segments dropped because an endpoint was behind the camera.
        clipped: usize,
    },
    DetectionFailed,
    PoseFailed(PoseError),
    EndOfStream,
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("frame source failed: {0:#}")]
    Source(anyhow::Error),
    #[error("renderer failed: {0:#}")]
    Render(anyhow::Error),
    #[error(transparent)]
    PoseLog(#[from] PoseLogError),
    #[error("frame loop is stopped")]
    Stopped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub frames: usize,
    pub poses_found: usize,
    pub detection_failures: usize,
    pub pose_failures: usize,
    /// Whether the loop ended on a quit signal rather than end of stream.
    pub quit: bool,
}

/// Segment ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Pt2,
    pub to: Pt2,
    pub color: Rgb,
}

/// Pose estimation and overlay projection for a calibrated camera.
#[derive(Debug, Clone)]
pub struct OverlayTracker {
    camera: PinholeCamera,
    estimator: PoseEstimator,
    models: Vec<OverlayModel>,
}

impl OverlayTracker {
    /// Fails if an edge of any model references a missing point.
    pub fn new(
        camera: PinholeCamera,
        estimator: PoseEstimator,
        models: Vec<OverlayModel>,
    ) -> Result<Self, OverlayError> {
        for model in &models {
            model.validate()?;
        }
        Ok(Self {
            camera,
            estimator,
            models,
        })
    }

    pub fn camera(&self) -> &PinholeCamera {
        &self.camera
    }

    pub fn models(&self) -> &[OverlayModel] {
        &self.models
    }

    pub fn track(&self, observation: &ObservationSet) -> Result<PoseSolution, PoseError> {
        self.estimator.solve(observation, &self.camera)
    }

    /// Project every model edge under `pose`. Returns the drawable segments
    /// and the number of edges with an endpoint behind the camera.
    pub fn segments(&self, pose: &Pose) -> (Vec<Segment>, usize) {
        let mut out = Vec::new();
        let mut clipped = 0;
        for model in &self.models {
            let pixels = project_points(&model.points, pose, &self.camera);
            for edge in &model.edges {
                match (pixels[edge.from], pixels[edge.to]) {
                    (Some(from), Some(to)) => out.push(Segment {
                        from,
                        to,
                        color: edge.color,
                    }),
                    _ => clipped += 1,
                }
            }
        }
        (out, clipped)
    }
}

/// The AR loop over its collaborators.
pub struct ArFrameLoop<S, D, R, C> {
    source: S,
    detector: D,
    renderer: R,
    control: C,
    tracker: OverlayTracker,
    pose_log: Option<PoseLog>,
    state: LoopState,
    summary: LoopSummary,
}

impl<S, D, R, C> ArFrameLoop<S, D, R, C>
where
    S: FrameSource,
    D: TargetDetector<S::Frame>,
    R: Renderer<S::Frame>,
    C: ControlInput,
{
    pub fn new(source: S, detector: D, renderer: R, control: C, tracker: OverlayTracker) -> Self {
        Self {
            source,
            detector,
            renderer,
            control,
            tracker,
            pose_log: None,
            state: LoopState::AwaitingFrame,
            summary: LoopSummary::default(),
        }
    }

    /// Append every rendered pose to `log`.
    pub fn with_pose_log(mut self, log: PoseLog) -> Self {
        self.pose_log = Some(log);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    fn enter(&mut self, next: LoopState) {
        debug!("frame loop: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn stop(&mut self) {
        if self.state != LoopState::Stopped {
            self.enter(LoopState::Stopped);
        }
    }

    /// Process one frame.
    pub fn step(&mut self) -> Result<FrameOutcome, LoopError> {
        if self.state == LoopState::Stopped {
            return Err(LoopError::Stopped);
        }
        self.enter(LoopState::AwaitingFrame);

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("end of stream after {} frames", self.summary.frames);
                self.stop();
                return Ok(FrameOutcome::EndOfStream);
            }
            Err(err) => {
                self.stop();
                return Err(LoopError::Source(err));
            }
        };
        self.summary.frames += 1;
        let index = self.summary.frames;

        self.enter(LoopState::Detecting);
        let outcome = match self.detector.detect(&frame) {
            None => {
                warn!("frame {index}: target not detected");
                self.summary.detection_failures += 1;
                self.enter(LoopState::DetectionFailed);
                FrameOutcome::DetectionFailed
            }
            Some(observation) => match self.tracker.track(&observation) {
                Err(err) => {
                    warn!("frame {index}: {err}");
                    self.summary.pose_failures += 1;
                    self.enter(LoopState::DetectionFailed);
                    FrameOutcome::PoseFailed(err)
                }
                Ok(solution) => {
                    self.enter(LoopState::PoseFound);
                    self.summary.poses_found += 1;
                    self.render(frame, &observation, &solution)?
                }
            },
        };

        if self.control.poll() == ControlSignal::Quit {
            info!("quit requested after frame {index}");
            self.summary.quit = true;
            self.stop();
        }
        Ok(outcome)
    }

    fn render(
        &mut self,
        frame: S::Frame,
        observation: &ObservationSet,
        solution: &PoseSolution,
    ) -> Result<FrameOutcome, LoopError> {
        self.enter(LoopState::Projecting);
        let (segments, clipped) = self.tracker.segments(&solution.pose);

        self.renderer.begin_frame(frame);
        for p in &observation.points_2d {
            self.renderer.draw_point(*p, DETECTION_COLOR);
        }
        for s in &segments {
            self.renderer.draw_segment(s.from, s.to, s.color);
        }
        if let Err(err) = self.renderer.commit_frame() {
            self.stop();
            return Err(LoopError::Render(err));
        }
        // only committed frames reach the log
        if let Some(log) = self.pose_log.as_mut() {
            if let Err(err) = log.append(&solution.pose) {
                self.stop();
                return Err(err.into());
            }
        }

        let (r, t) = (solution.pose.rvec(), solution.pose.tvec());
        info!(
            "frame {}: rvec [{:.4} {:.4} {:.4}] tvec [{:.4} {:.4} {:.4}] rms {:.3} px",
            self.summary.frames, r.x, r.y, r.z, t.x, t.y, t.z, solution.rms
        );
        self.enter(LoopState::Rendered);
        Ok(FrameOutcome::Rendered {
            pose: solution.pose,
            rms: solution.rms,
            segments: segments.len(),
            clipped,
        })
    }

    /// Step until the loop stops.
    pub fn run(&mut self) -> Result<LoopSummary, LoopError> {
        while self.state != LoopState::Stopped {
            self.step()?;
        }
        Ok(self.summary)
    }
}
