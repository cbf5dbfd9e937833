//! JSON configuration shared by the calibration and tracking front ends.

use crate::calibration::EstimatorOptions;
use crate::collector::GridSize;
use crate::frame_loop::TargetKind;
use crate::pose::PoseOptions;
use anyhow::{ensure, Context, Result};
use arcam_core::{OverlayLibrary, OverlayModel, Real};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    /// Inner-corner grid of the calibration board.
    pub grid: GridSize,
    /// Edge length of one board square, in target units.
    pub square_size: Real,
    pub calibration: EstimatorOptions,
    pub pose: PoseOptions,
    pub target: TargetKind,
    /// Overlay models drawn on every tracked frame, by name.
    pub overlays: Vec<String>,
    /// Stroke width of overlay lines in pixels.
    pub line_thickness: u32,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            square_size: 1.0,
            calibration: EstimatorOptions::default(),
            pose: PoseOptions::default(),
            target: TargetKind::Checkerboard,
            overlays: vec!["axes".to_string(), "cube".to_string()],
            line_thickness: 2,
        }
    }
}

impl ArConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.grid.rows >= 1 && self.grid.cols >= 1,
            "grid must have at least one row and column, got {}x{}",
            self.grid.rows,
            self.grid.cols
        );
        ensure!(
            self.square_size.is_finite() && self.square_size > 0.0,
            "square_size must be positive, got {}",
            self.square_size
        );
        if let TargetKind::Marker { side, .. } = self.target {
            ensure!(
                side.is_finite() && side > 0.0,
                "marker side must be positive, got {side}"
            );
        }
        ensure!(self.line_thickness >= 1, "line_thickness must be at least 1");
        Ok(())
    }

    /// The configured overlay models from the built-in library.
    pub fn overlay_models(&self) -> Result<Vec<OverlayModel>> {
        Ok(OverlayLibrary::builtin().select(&self.overlays)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ArConfig = serde_json::from_str(
            r#"{ "square_size": 0.025, "pose": { "solve": { "max_iters": 10 } } }"#,
        )
        .unwrap();
        assert_eq!(config.square_size, 0.025);
        assert_eq!(config.pose.solve.max_iters, 10);
        assert_eq!(config.pose.solve.tolerance, 1e-3);
        assert_eq!(config.grid, GridSize::new(6, 9));
        assert_eq!(config.calibration.min_observations, 5);
        assert_eq!(config.target, TargetKind::Checkerboard);
    }

    #[test]
    fn marker_target_from_json() {
        let config: ArConfig =
            serde_json::from_str(r#"{ "target": { "kind": "marker", "id": 23, "side": 5.0 } }"#)
                .unwrap();
        assert_eq!(config.target, TargetKind::Marker { id: 23, side: 5.0 });
    }

    #[test]
    fn load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{ "square_size": -1.0 }}"#).unwrap();
        drop(f);
        assert!(ArConfig::load(&path).is_err());

        std::fs::write(&path, serde_json::to_string(&ArConfig::default()).unwrap()).unwrap();
        assert_eq!(ArConfig::load(&path).unwrap(), ArConfig::default());
    }

    #[test]
    fn unknown_overlay_is_an_error() {
        let config = ArConfig {
            overlays: vec!["teapot".to_string()],
            ..ArConfig::default()
        };
        assert!(config.overlay_models().is_err());
        assert_eq!(ArConfig::default().overlay_models().unwrap().len(), 2);
    }
}
