use crate::calibrate::load_config;
use crate::detections::Detections;
use crate::keys::KeyControl;
use crate::render::ImageWriter;
use crate::source::{ImageDirectory, LoadedImage};
use anyhow::{Context, Result};
use arcam_core::{ObservationSet, OverlayLibrary};
use arcam_pipeline::{
    read_params, ArFrameLoop, CheckerboardTarget, LoopSummary, MarkerTarget, OverlayTracker,
    PoseEstimator, PoseLog, TargetDetector, TargetKind,
};
use clap::Args;
use log::info;
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct TrackArgs {
    /// Directory of frames to annotate.
    #[arg(long)]
    pub images: PathBuf,

    /// JSON file with detected corners or markers per image.
    #[arg(long)]
    pub detections: PathBuf,

    /// Calibration parameter file.
    #[arg(long)]
    pub calibration: PathBuf,

    /// Optional JSON ArConfig. Defaults are used if omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where `output_<name>` frames are written.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Append-only log of per-frame rotation and translation vectors.
    #[arg(long)]
    pub pose_log: Option<PathBuf>,

    /// Overlay models to draw, comma separated. Overrides the config.
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Track the marker with this id instead of the checkerboard.
    #[arg(long)]
    pub marker_id: Option<u32>,

    /// Marker side length in target units.
    #[arg(long)]
    pub marker_side: Option<f64>,

    /// Wait for a key after every frame.
    #[arg(long)]
    pub step: bool,
}

enum Target {
    Board(CheckerboardTarget<Detections>),
    Marker(MarkerTarget<Detections>),
}

impl TargetDetector<LoadedImage> for Target {
    fn detect(&mut self, frame: &LoadedImage) -> Option<ObservationSet> {
        match self {
            Target::Board(t) => t.detect(frame),
            Target::Marker(t) => t.detect(frame),
        }
    }
}

fn target_kind(args: &TrackArgs, configured: TargetKind, square_size: f64) -> TargetKind {
    let configured_side = match configured {
        TargetKind::Marker { side, .. } => Some(side),
        TargetKind::Checkerboard => None,
    };
    match args.marker_id {
        Some(id) => TargetKind::Marker {
            id,
            side: args.marker_side.or(configured_side).unwrap_or(square_size),
        },
        None => configured,
    }
}

pub fn run_track<R: BufRead>(args: &TrackArgs, input: R) -> Result<LoopSummary> {
    let params = read_params(&args.calibration).with_context(|| {
        format!(
            "cannot load calibration from {}",
            args.calibration.display()
        )
    })?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(models) = &args.models {
        config.overlays = models.clone();
    }
    let models = OverlayLibrary::builtin().select(&config.overlays)?;
    let detections = Detections::load(&args.detections)?;
    let source = ImageDirectory::open(&args.images)?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    let target = match target_kind(args, config.target, config.square_size) {
        TargetKind::Checkerboard => Target::Board(CheckerboardTarget::new(
            detections,
            config.grid,
            config.square_size,
        )),
        TargetKind::Marker { id, side } => {
            info!("tracking marker {id} (side {side})");
            Target::Marker(MarkerTarget::new(detections, id, side))
        }
    };
    let control = if args.step {
        KeyControl::waiting(input)
    } else {
        KeyControl::free_running()
    };
    let tracker = OverlayTracker::new(params.camera, PoseEstimator::new(config.pose), models)?;
    let renderer = ImageWriter::new(args.output_dir.clone(), config.line_thickness);

    let mut ar = ArFrameLoop::new(source, target, renderer, control, tracker);
    if let Some(path) = &args.pose_log {
        ar = ar.with_pose_log(PoseLog::create(path)?);
    }
    let summary = ar.run()?;

    println!(
        "{} frames: {} tracked, {} without target, {} pose failures",
        summary.frames, summary.poses_found, summary.detection_failures, summary.pose_failures
    );
    Ok(summary)
}
