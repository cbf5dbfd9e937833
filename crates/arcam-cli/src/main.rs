//! `arcam`: checkerboard calibration and AR overlay tracking over image
//! directories.

mod calibrate;
mod detections;
mod keys;
mod render;
mod source;
mod track;

use anyhow::Result;
use arcam_core::OverlayLibrary;
use calibrate::{run_calibrate, CalibrateArgs};
use clap::{Parser, Subcommand};
use track::{run_track, TrackArgs};

#[derive(Debug, Parser)]
#[command(name = "arcam", version, about = "Monocular camera calibration and AR overlays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Estimate intrinsics and distortion from checkerboard images.
    Calibrate(CalibrateArgs),
    /// Estimate per-frame target pose and draw overlay models.
    Track(TrackArgs),
    /// Print the built-in overlay models as JSON.
    Models,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Calibrate(args) => {
            run_calibrate(&args, std::io::stdin().lock())?;
        }
        Commands::Track(args) => {
            run_track(&args, std::io::stdin().lock())?;
        }
        Commands::Models => println!("{}", models_json()?),
    }
    Ok(())
}

fn models_json() -> Result<String> {
    Ok(serde_json::to_string_pretty(OverlayLibrary::builtin().all())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcam_core::synthetic::planar;
    use arcam_core::{BrownConrady5, Intrinsics, OverlayModel, PinholeCamera};
    use arcam_pipeline::{read_params, read_pose_log, CalibrationError};
    use crate::detections::Detections;
    use clap::Parser;
    use image::RgbImage;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const VIEWS: usize = 8;

    fn ground_truth() -> PinholeCamera {
        PinholeCamera::new(
            Intrinsics::new(800.0, 790.0, 321.0, 238.0).unwrap(),
            BrownConrady5 {
                k1: -0.1,
                k2: 0.02,
                ..Default::default()
            },
        )
    }

    fn name(k: usize) -> String {
        format!("view{k:02}.png")
    }

    /// Blank 640x480 frames plus corner detections of a synthetic board.
    /// The last frame has no detection entry.
    fn dataset() -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir(&images).unwrap();

        let board = planar::board_points(6, 9, 1.0);
        let poses = planar::orbit_poses(VIEWS, &planar::board_center(6, 9, 1.0), 20.0);
        let mut detections = Detections::default();
        for (k, pose) in poses.iter().enumerate() {
            RgbImage::new(640, 480).save(images.join(name(k))).unwrap();
            let obs = planar::project_view(&ground_truth(), &board, pose).unwrap();
            detections.corners.insert(
                name(k),
                obs.points_2d.iter().map(|p| [p.x, p.y]).collect(),
            );
        }
        RgbImage::new(640, 480)
            .save(images.join(name(VIEWS)))
            .unwrap();

        let det_path = dir.path().join("detections.json");
        std::fs::write(&det_path, serde_json::to_string(&detections).unwrap()).unwrap();
        (dir, images, det_path)
    }

    fn calibrate_args(root: &Path, images: &Path, detections: &Path) -> CalibrateArgs {
        CalibrateArgs {
            images: images.to_path_buf(),
            detections: detections.to_path_buf(),
            config: None,
            output: root.join("calibration_parameters.txt"),
            extrinsics: Some(root.join("rotations_translations.txt")),
            interactive: false,
        }
    }

    fn track_args(root: &Path, images: &Path, detections: &Path) -> TrackArgs {
        TrackArgs {
            images: images.to_path_buf(),
            detections: detections.to_path_buf(),
            calibration: root.join("calibration_parameters.txt"),
            config: None,
            output_dir: root.join("out"),
            pose_log: Some(root.join("poses.txt")),
            models: Some(vec!["axes".into(), "pyramid".into()]),
            marker_id: None,
            marker_side: None,
            step: false,
        }
    }

    #[test]
    fn calibrate_then_track() {
        let (dir, images, det) = dataset();
        let root = dir.path();

        let result = run_calibrate(&calibrate_args(root, &images, &det), Cursor::new("")).unwrap();
        assert_eq!(result.poses.len(), VIEWS);
        assert!(result.rms < 0.5, "rms {}", result.rms);

        let params = read_params(&root.join("calibration_parameters.txt")).unwrap();
        assert!((params.camera.intrinsics.fx - 800.0).abs() < 16.0);
        let extrinsics = std::fs::read_to_string(root.join("rotations_translations.txt")).unwrap();
        assert!(extrinsics.starts_with("Image 1 (view00.png):"));

        let summary = run_track(&track_args(root, &images, &det), Cursor::new("")).unwrap();
        assert_eq!(summary.frames, VIEWS + 1);
        assert_eq!(summary.poses_found, VIEWS);
        assert_eq!(summary.detection_failures, 1);
        assert!(root.join("out").join("output_view00.png").exists());
        assert!(!root.join("out").join(format!("output_{}", name(VIEWS))).exists());
        assert_eq!(read_pose_log(&root.join("poses.txt")).unwrap().len(), VIEWS);
    }

    #[test]
    fn interactive_capture_saves_on_s() {
        let (dir, images, det) = dataset();
        let root = dir.path();
        let mut args = calibrate_args(root, &images, &det);
        args.interactive = true;

        // view01 is skipped, view07 ends the session
        let keys = "s\n\ns\ns\ns\ns\ns\nq\n";
        let result = run_calibrate(&args, Cursor::new(keys)).unwrap();
        assert_eq!(result.poses.len(), 6);
        let extrinsics = std::fs::read_to_string(root.join("rotations_translations.txt")).unwrap();
        assert!(!extrinsics.contains("view01.png"));
        assert!(extrinsics.contains("Image 2 (view02.png):"));
    }

    #[test]
    fn quitting_early_leaves_too_few_samples() {
        let (dir, images, det) = dataset();
        let mut args = calibrate_args(dir.path(), &images, &det);
        args.interactive = true;
        let err = run_calibrate(&args, Cursor::new("s\ns\nq\n")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CalibrationError>(),
            Some(CalibrationError::InsufficientSamples { found: 2, .. })
        ));
        assert!(!dir.path().join("calibration_parameters.txt").exists());
    }

    #[test]
    fn track_needs_a_calibration_file() {
        let (dir, images, det) = dataset();
        let err = run_track(&track_args(dir.path(), &images, &det), Cursor::new("")).unwrap_err();
        assert!(format!("{err:#}").contains("cannot load calibration"));
    }

    #[test]
    fn unknown_model_is_rejected_before_tracking() {
        let (dir, images, det) = dataset();
        let root = dir.path();
        run_calibrate(&calibrate_args(root, &images, &det), Cursor::new("")).unwrap();
        let mut args = track_args(root, &images, &det);
        args.models = Some(vec!["teapot".into()]);
        assert!(run_track(&args, Cursor::new("")).is_err());
        assert!(!root.join("out").exists());
    }

    #[test]
    fn models_json_lists_builtin_shapes() {
        let models: Vec<OverlayModel> = serde_json::from_str(&models_json().unwrap()).unwrap();
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["axes", "cube", "pyramid", "prism"]);
    }

    #[test]
    fn cli_parses_track_flags() {
        let cli = Cli::try_parse_from([
            "arcam",
            "track",
            "--images",
            "frames",
            "--detections",
            "d.json",
            "--calibration",
            "c.txt",
            "--models",
            "axes,cube",
            "--marker-id",
            "23",
        ])
        .unwrap();
        match cli.command {
            Commands::Track(args) => {
                assert_eq!(args.models.unwrap(), ["axes", "cube"]);
                assert_eq!(args.marker_id, Some(23));
                assert_eq!(args.output_dir, PathBuf::from("."));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
