//! Declarative wireframe shapes drawn over a tracked target.
//!
//! Shapes are data: a point set in target units plus an edge list. A single
//! render routine walks the edges of any model, so adding a shape never
//! means writing drawing code.

use crate::{Pt3, Real};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 8-bit RGB colour.
pub type Rgb = [u8; 3];

pub const RED: Rgb = [255, 0, 0];
pub const GREEN: Rgb = [0, 255, 0];
pub const BLUE: Rgb = [0, 0, 255];
pub const YELLOW: Rgb = [255, 255, 0];
pub const CYAN: Rgb = [0, 255, 255];
pub const MAGENTA: Rgb = [255, 0, 255];

/// Default length of the coordinate axes, in target units.
pub const DEFAULT_AXIS_LENGTH: Real = 3.0;

const CUBE_POINTS: [[Real; 3]; 8] = [
    [2.0, 2.0, -2.0],
    [2.0, 0.0, -2.0],
    [0.0, 0.0, -2.0],
    [0.0, 2.0, -2.0],
    [2.0, 2.0, 0.0],
    [2.0, 0.0, 0.0],
    [0.0, 0.0, 0.0],
    [0.0, 2.0, 0.0],
];
const CUBE_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

const PYRAMID_POINTS: [[Real; 3]; 5] = [
    [0.0, 0.0, -3.0],
    [1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [-1.0, 1.0, 0.0],
];
const PYRAMID_EDGES: [[usize; 2]; 8] = [
    [0, 1],
    [0, 2],
    [0, 3],
    [0, 4],
    [1, 2],
    [2, 3],
    [3, 4],
    [4, 1],
];

const PRISM_POINTS: [[Real; 3]; 5] = [
    [-2.0, -2.0, -1.0],
    [-2.0, -4.0, -1.0],
    [-4.0, -4.0, -1.0],
    [-4.0, -2.0, -1.0],
    [-3.0, -3.0, 1.0],
];
const PRISM_EDGES: [[usize; 2]; 8] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 4],
    [1, 4],
    [2, 4],
    [3, 4],
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("model `{model}`: edge {edge} references point {index}, but only {len} points exist")]
    EdgeOutOfRange {
        model: String,
        edge: usize,
        index: usize,
        len: usize,
    },
    #[error("unknown overlay model `{0}`")]
    UnknownModel(String),
}

/// One wireframe segment between two model points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
    pub color: Rgb,
}

/// Named 3D shape: points in target units plus edge topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayModel {
    pub name: String,
    pub points: Vec<Pt3>,
    pub edges: Vec<Edge>,
}

impl OverlayModel {
    /// Build a model, checking that every edge references an existing point.
    pub fn new(
        name: impl Into<String>,
        points: Vec<Pt3>,
        edges: Vec<Edge>,
    ) -> Result<Self, OverlayError> {
        let model = Self {
            name: name.into(),
            points,
            edges,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), OverlayError> {
        let len = self.points.len();
        for (edge, e) in self.edges.iter().enumerate() {
            for index in [e.from, e.to] {
                if index >= len {
                    return Err(OverlayError::EdgeOutOfRange {
                        model: self.name.clone(),
                        edge,
                        index,
                        len,
                    });
                }
            }
        }
        Ok(())
    }

    /// Coordinate axes: origin plus tips at `(length, 0, 0)`, `(0, length, 0)`
    /// and `(0, 0, -length)`, drawn red, green and blue.
    pub fn axes(length: Real) -> Self {
        Self {
            name: "axes".to_string(),
            points: vec![
                Pt3::origin(),
                Pt3::new(length, 0.0, 0.0),
                Pt3::new(0.0, length, 0.0),
                Pt3::new(0.0, 0.0, -length),
            ],
            edges: vec![
                Edge {
                    from: 0,
                    to: 1,
                    color: RED,
                },
                Edge {
                    from: 0,
                    to: 2,
                    color: GREEN,
                },
                Edge {
                    from: 0,
                    to: 3,
                    color: BLUE,
                },
            ],
        }
    }

    pub fn cube() -> Self {
        Self::from_table("cube", &CUBE_POINTS, &CUBE_EDGES, CYAN)
    }

    pub fn pyramid() -> Self {
        Self::from_table("pyramid", &PYRAMID_POINTS, &PYRAMID_EDGES, YELLOW)
    }

    pub fn prism() -> Self {
        Self::from_table("prism", &PRISM_POINTS, &PRISM_EDGES, MAGENTA)
    }

    fn from_table(name: &str, points: &[[Real; 3]], edges: &[[usize; 2]], color: Rgb) -> Self {
        Self {
            name: name.to_string(),
            points: points.iter().map(|p| Pt3::new(p[0], p[1], p[2])).collect(),
            edges: edges
                .iter()
                .map(|&[from, to]| Edge { from, to, color })
                .collect(),
        }
    }
}

/// Fixed table of named overlay shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLibrary {
    models: Vec<OverlayModel>,
}

impl Default for OverlayLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OverlayLibrary {
    /// `axes`, `cube`, `pyramid` and `prism`.
    pub fn builtin() -> Self {
        Self {
            models: vec![
                OverlayModel::axes(DEFAULT_AXIS_LENGTH),
                OverlayModel::cube(),
                OverlayModel::pyramid(),
                OverlayModel::prism(),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&OverlayModel> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Look up several models by name, failing on the first unknown one.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<OverlayModel>, OverlayError> {
        names
            .iter()
            .map(|n| {
                self.get(n.as_ref())
                    .cloned()
                    .ok_or_else(|| OverlayError::UnknownModel(n.as_ref().to_string()))
            })
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.name.as_str())
    }

    pub fn all(&self) -> &[OverlayModel] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shapes_have_expected_topology() {
        let lib = OverlayLibrary::builtin();
        let counts: Vec<(&str, usize, usize)> = lib
            .all()
            .iter()
            .map(|m| (m.name.as_str(), m.points.len(), m.edges.len()))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("axes", 4, 3),
                ("cube", 8, 12),
                ("pyramid", 5, 8),
                ("prism", 5, 8)
            ]
        );
        for model in lib.all() {
            model.validate().unwrap();
        }
    }

    #[test]
    fn edges_out_of_range_are_rejected() {
        let err = OverlayModel::new(
            "broken",
            vec![Pt3::origin(), Pt3::new(1.0, 0.0, 0.0)],
            vec![Edge {
                from: 0,
                to: 2,
                color: RED,
            }],
        )
        .unwrap_err();
        assert!(matches!(err, OverlayError::EdgeOutOfRange { index: 2, len: 2, .. }));
    }

    #[test]
    fn axes_scale_with_length() {
        let axes = OverlayModel::axes(1.0);
        assert_eq!(axes.points[3], Pt3::new(0.0, 0.0, -1.0));
        assert_eq!(axes.edges[0].color, RED);
    }

    #[test]
    fn select_by_name() {
        let lib = OverlayLibrary::builtin();
        let picked = lib.select(&["cube", "axes"]).unwrap();
        assert_eq!(picked[0].name, "cube");
        assert_eq!(picked[1].name, "axes");
        assert_eq!(
            lib.select(&["teapot"]).unwrap_err(),
            OverlayError::UnknownModel("teapot".into())
        );
        assert_eq!(lib.names().count(), 4);
    }

    #[test]
    fn json_round_trip() {
        let model = OverlayModel::pyramid();
        let json = serde_json::to_string(&model).unwrap();
        let back: OverlayModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }
}
