use crate::detections::Detections;
use crate::keys::KeyReader;
use crate::source::ImageDirectory;
use anyhow::{bail, Context, Result};
use arcam_core::ImageSize;
use arcam_pipeline::{
    param_store, write_params, ArConfig, CalibrationEstimator, CalibrationParams,
    CalibrationResult, CaptureEvent, CaptureSession, CornerObservationCollector, FrameSource,
};
use clap::Args;
use log::{info, warn};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct CalibrateArgs {
    /// Directory of checkerboard images.
    #[arg(long)]
    pub images: PathBuf,

    /// JSON file with detected corners per image.
    #[arg(long)]
    pub detections: PathBuf,

    /// Optional JSON ArConfig. Defaults are used if omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Calibration parameter file to write.
    #[arg(long, default_value = "calibration_parameters.txt")]
    pub output: PathBuf,

    /// Also write per-view rotation and translation vectors here.
    #[arg(long)]
    pub extrinsics: Option<PathBuf>,

    /// Ask for a key per image: `s` saves it, `q` stops collecting.
    #[arg(long)]
    pub interactive: bool,
}

pub fn load_config(path: Option<&std::path::Path>) -> Result<ArConfig> {
    match path {
        Some(p) => ArConfig::load(p),
        None => Ok(ArConfig::default()),
    }
}

pub fn run_calibrate<R: BufRead>(args: &CalibrateArgs, input: R) -> Result<CalibrationResult> {
    let config = load_config(args.config.as_deref())?;
    let detections = Detections::load(&args.detections)?;
    let mut source = ImageDirectory::open(&args.images)?;
    if source.is_empty() {
        bail!("no images found in {}", args.images.display());
    }

    let collector = CornerObservationCollector::new(config.grid, config.square_size);
    let mut session = CaptureSession::new(collector);
    let mut keys = KeyReader::new(input);
    let mut saved_names = Vec::new();
    let mut image_size: Option<ImageSize> = None;

    while let Some(frame) = source.next_frame()? {
        let size = *image_size.get_or_insert(frame.size());
        if frame.size() != size {
            warn!(
                "{}: size {}x{} differs from {}x{}, skipped",
                frame.name, frame.image.width(), frame.image.height(), size.width, size.height
            );
            continue;
        }
        let corners = detections.corners_for(&frame.name);

        let key = if args.interactive {
            eprintln!(
                "{}: {} ([s]ave, [q]uit, [enter] next)",
                frame.name,
                if corners.is_some() { "corners found" } else { "no corners" }
            );
            keys.next_key().unwrap_or('q')
        } else {
            's'
        };

        match session.handle(key, corners.as_deref()) {
            CaptureEvent::Saved { .. } => saved_names.push(frame.name),
            CaptureEvent::Quit => break,
            CaptureEvent::Rejected(reason) => warn!("{}: {reason}", frame.name),
            CaptureEvent::NoDetection | CaptureEvent::Skipped => {}
        }
    }

    let Some(image_size) = image_size else {
        bail!("no readable images in {}", args.images.display());
    };
    let observations = session.finish();
    info!(
        "calibrating from {} views of {}x{} images",
        observations.len(),
        image_size.width,
        image_size.height
    );

    let result = CalibrationEstimator::new(config.calibration)
        .estimate(&observations, image_size)
        .context("calibration failed")?;

    write_params(
        &args.output,
        &CalibrationParams {
            camera: result.camera,
            rms: Some(result.rms),
        },
    )?;
    info!("wrote {}", args.output.display());

    if let Some(path) = &args.extrinsics {
        param_store::write_extrinsics(
            path,
            saved_names.iter().map(String::as_str).zip(&result.poses),
        )?;
        info!("wrote {}", path.display());
    }

    let k = result.camera.intrinsics;
    let d = result.camera.distortion;
    println!(
        "fx={:.3} fy={:.3} cx={:.3} cy={:.3}",
        k.fx, k.fy, k.cx, k.cy
    );
    println!(
        "k1={:.6} k2={:.6} p1={:.6} p2={:.6} k3={:.6}",
        d.k1, d.k2, d.p1, d.p2, d.k3
    );
    println!(
        "reprojection error: {:.4} px ({} views, {} iterations)",
        result.rms,
        result.poses.len(),
        result.iterations
    );
    Ok(result)
}
