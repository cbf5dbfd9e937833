//! Detector output supplied as JSON, keyed by image file name.

use crate::source::LoadedImage;
use anyhow::{Context, Result};
use arcam_core::Pt2;
use arcam_pipeline::{CornerDetector, MarkerDetection, MarkerDetector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerEntry {
    pub id: u32,
    pub corners: [[f64; 2]; 4],
}

/// `{ "corners": { name: [[u, v], ...] }, "markers": { name: [{ id, corners }] } }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detections {
    pub corners: BTreeMap<String, Vec<[f64; 2]>>,
    pub markers: BTreeMap<String, Vec<MarkerEntry>>,
}

impl Detections {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read detections {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid detections file {}", path.display()))
    }

    pub fn corners_for(&self, name: &str) -> Option<Vec<Pt2>> {
        self.corners
            .get(name)
            .map(|pts| pts.iter().map(|&[u, v]| Pt2::new(u, v)).collect())
    }

    pub fn markers_for(&self, name: &str) -> Vec<MarkerDetection> {
        self.markers
            .get(name)
            .map(|list| {
                list.iter()
                    .map(|m| MarkerDetection {
                        id: m.id,
                        corners: m.corners.map(|[u, v]| Pt2::new(u, v)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CornerDetector<LoadedImage> for Detections {
    fn detect_corners(&mut self, frame: &LoadedImage) -> Option<Vec<Pt2>> {
        self.corners_for(&frame.name)
    }
}

impl MarkerDetector<LoadedImage> for Detections {
    fn detect_markers(&mut self, frame: &LoadedImage) -> Vec<MarkerDetection> {
        self.markers_for(&frame.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_sections() {
        let json = r#"{
            "corners": { "img01.png": [[1.5, 2.0], [3.0, 4.0]] },
            "markers": { "img07.png": [ { "id": 23, "corners": [[0,0],[1,0],[1,1],[0,1]] } ] }
        }"#;
        let d: Detections = serde_json::from_str(json).unwrap();
        assert_eq!(
            d.corners_for("img01.png").unwrap(),
            vec![Pt2::new(1.5, 2.0), Pt2::new(3.0, 4.0)]
        );
        assert!(d.corners_for("img07.png").is_none());
        let markers = d.markers_for("img07.png");
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, 23);
        assert_eq!(markers[0].corners[2], Pt2::new(1.0, 1.0));
        assert!(d.markers_for("img01.png").is_empty());
    }

    #[test]
    fn sections_are_optional() {
        let d: Detections = serde_json::from_str(r#"{ "corners": {} }"#).unwrap();
        assert!(d.markers.is_empty());
    }
}
