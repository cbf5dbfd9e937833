//! Text persistence of calibration results.
//!
//! Parameter file layout:
//!
//! ```text
//! Camera matrix:
//! fx 0 cx
//! 0 fy cy
//! 0 0 1
//! Distortion coefficients:
//! k1 k2 p1 p2 k3
//! Reprojection error:
//! 0.123
//! ```
//!
//! The reader is a small explicit schema: known headers end in `:` and may
//! carry values on the same line; numbers may be separated by whitespace,
//! `,` or `;` and wrapped in `[` `]`, so OpenCV's matrix stream format
//! reads too. Distortion accepts 4, 5 or 8 coefficients (see
//! [`BrownConrady5::from_coeffs`]). Duplicate or unknown headers are errors.

use arcam_core::{
    BrownConrady5, DistortionError, Intrinsics, IntrinsicsError, Mat3, PinholeCamera, Pose, Real,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unknown section header `{header}`")]
    UnknownHeader { line: usize, header: String },
    #[error("line {line}: duplicate section `{section}`")]
    DuplicateSection { line: usize, section: &'static str },
    #[error("line {line}: values appear before any section header")]
    ValueOutsideSection { line: usize },
    #[error("line {line}: `{token}` is not a number")]
    BadNumber { line: usize, token: String },
    #[error("missing section `{0}`")]
    MissingSection(&'static str),
    #[error("section `{section}` holds {found} values, expected {expected}")]
    ValueCount {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid camera matrix: {0}")]
    CameraMatrix(#[from] IntrinsicsError),
    #[error("invalid distortion coefficients: {0}")]
    Distortion(#[from] DistortionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    CameraMatrix,
    Distortion,
    ReprojectionError,
}

impl Section {
    const ALL: [Section; 3] = [
        Section::CameraMatrix,
        Section::Distortion,
        Section::ReprojectionError,
    ];

    fn label(self) -> &'static str {
        match self {
            Section::CameraMatrix => "Camera matrix",
            Section::Distortion => "Distortion coefficients",
            Section::ReprojectionError => "Reprojection error",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Contents of a calibration parameter file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParams {
    pub camera: PinholeCamera,
    /// RMS reprojection error of the calibration, when recorded.
    pub rms: Option<Real>,
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '[' | ']'))
        .filter(|t| !t.is_empty())
}

/// Parse the text form of a parameter file.
pub fn parse_params(text: &str) -> Result<CalibrationParams, ParamError> {
    let mut values: [Option<Vec<Real>>; 3] = [None, None, None];
    let mut current: Option<Section> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rest = match trimmed.split_once(':') {
            Some((header, rest)) => {
                let section =
                    Section::from_label(header).ok_or_else(|| ParamError::UnknownHeader {
                        line,
                        header: header.trim().to_string(),
                    })?;
                if values[section.index()].is_some() {
                    return Err(ParamError::DuplicateSection {
                        line,
                        section: section.label(),
                    });
                }
                values[section.index()] = Some(Vec::new());
                current = Some(section);
                rest
            }
            None => trimmed,
        };

        for token in tokens(rest) {
            let section = current.ok_or(ParamError::ValueOutsideSection { line })?;
            let v: Real = token.parse().map_err(|_| ParamError::BadNumber {
                line,
                token: token.to_string(),
            })?;
            if let Some(list) = values[section.index()].as_mut() {
                list.push(v);
            }
        }
    }

    let [camera, distortion, rms] = values;
    let camera = camera.ok_or(ParamError::MissingSection(Section::CameraMatrix.label()))?;
    if camera.len() != 9 {
        return Err(ParamError::ValueCount {
            section: Section::CameraMatrix.label(),
            expected: 9,
            found: camera.len(),
        });
    }
    let kmtx = Mat3::from_row_slice(&camera);
    let intrinsics = Intrinsics::try_from_k_matrix(&kmtx)?;

    let distortion = distortion.ok_or(ParamError::MissingSection(Section::Distortion.label()))?;
    let distortion = BrownConrady5::from_coeffs(&distortion)?;

    let rms = match rms {
        None => None,
        Some(v) if v.len() == 1 => Some(v[0]),
        Some(v) => {
            return Err(ParamError::ValueCount {
                section: Section::ReprojectionError.label(),
                expected: 1,
                found: v.len(),
            })
        }
    };

    Ok(CalibrationParams {
        camera: PinholeCamera::new(intrinsics, distortion),
        rms,
    })
}

/// Text form of a parameter file, distortion in the 5-slot order.
pub fn format_params(params: &CalibrationParams) -> String {
    let k = params.camera.intrinsics.k_matrix();
    let mut out = format!("{}:\n", Section::CameraMatrix.label());
    for r in 0..3 {
        out.push_str(&format!("{} {} {}\n", k[(r, 0)], k[(r, 1)], k[(r, 2)]));
    }
    let c = params.camera.distortion.coeffs();
    out.push_str(&format!("{}:\n", Section::Distortion.label()));
    out.push_str(&format!("{} {} {} {} {}\n", c[0], c[1], c[2], c[3], c[4]));
    if let Some(rms) = params.rms {
        out.push_str(&format!("{}:\n{rms}\n", Section::ReprojectionError.label()));
    }
    out
}

pub fn read_params(path: &Path) -> Result<CalibrationParams, ParamError> {
    let text = fs::read_to_string(path).map_err(|source| ParamError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_params(&text)
}

pub fn write_params(path: &Path, params: &CalibrationParams) -> Result<(), ParamError> {
    fs::write(path, format_params(params)).map_err(|source| ParamError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-view extrinsics report: an `Image N:` block per view with its
/// rotation and translation vectors.
pub fn format_extrinsics<'a, I>(views: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Pose)>,
{
    let mut out = String::new();
    for (idx, (name, pose)) in views.into_iter().enumerate() {
        let (r, t) = (pose.rvec(), pose.tvec());
        out.push_str(&format!(
            "Image {} ({name}):\nRotation vector:\n{} {} {}\nTranslation vector:\n{} {} {}\n",
            idx + 1,
            r.x,
            r.y,
            r.z,
            t.x,
            t.y,
            t.z
        ));
        out.push('\n');
    }
    out
}

pub fn write_extrinsics<'a, I>(path: &Path, views: I) -> Result<(), ParamError>
where
    I: IntoIterator<Item = (&'a str, &'a Pose)>,
{
    fs::write(path, format_extrinsics(views)).map_err(|source| ParamError::Io {
        path: path.to_path_buf(),
        source,
    })
}
