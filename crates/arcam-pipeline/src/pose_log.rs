//! Append-only pose log: per tracked frame, one line with the rotation
//! vector and one with the translation vector, three space-separated values
//! each.

use arcam_core::{Pose, Real, Vec3};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseLogError {
    #[error("cannot open pose log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write pose log: {0}")]
    Write(#[from] std::io::Error),
    #[error("pose log line {line}: expected 3 numbers, got `{text}`")]
    Malformed { line: usize, text: String },
    #[error("pose log ends with an unpaired rotation line")]
    Truncated,
}

/// Writer side of the pose log. Every append is flushed so an interrupted
/// session keeps all completed frames.
pub struct PoseLog {
    out: Box<dyn Write + Send>,
    entries: usize,
}

impl std::fmt::Debug for PoseLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseLog")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl PoseLog {
    /// Truncate or create `path`.
    pub fn create(path: &Path) -> Result<Self, PoseLogError> {
        let file = File::create(path).map_err(|source| PoseLogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    /// Open `path` for appending, creating it if needed.
    pub fn append_to(path: &Path) -> Result<Self, PoseLogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| PoseLogError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn from_writer<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Box::new(out),
            entries: 0,
        }
    }

    pub fn append(&mut self, pose: &Pose) -> Result<(), PoseLogError> {
        let (r, t) = (pose.rvec(), pose.tvec());
        writeln!(self.out, "{} {} {}", r.x, r.y, r.z)?;
        writeln!(self.out, "{} {} {}", t.x, t.y, t.z)?;
        self.out.flush()?;
        self.entries += 1;
        Ok(())
    }

    /// Poses appended through this handle.
    pub fn entries(&self) -> usize {
        self.entries
    }
}

fn parse_triplet(line: usize, text: &str) -> Result<Vec3, PoseLogError> {
    let malformed = || PoseLogError::Malformed {
        line,
        text: text.to_string(),
    };
    let values = text
        .split_whitespace()
        .map(|t| t.parse::<Real>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| malformed())?;
    match values.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(malformed()),
    }
}

/// Parse the text of a pose log back into poses.
pub fn parse_pose_log(text: &str) -> Result<Vec<Pose>, PoseLogError> {
    let mut poses = Vec::new();
    let mut pending: Option<Vec3> = None;
    for (idx, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let v = parse_triplet(idx + 1, raw)?;
        match pending.take() {
            None => pending = Some(v),
            Some(rvec) => poses.push(Pose::from_rvec_tvec(rvec, v)),
        }
    }
    if pending.is_some() {
        return Err(PoseLogError::Truncated);
    }
    Ok(poses)
}

pub fn read_pose_log(path: &Path) -> Result<Vec<Pose>, PoseLogError> {
    let text = fs::read_to_string(path).map_err(|source| PoseLogError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pose_log(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(k: Real) -> Pose {
        Pose::from_rvec_tvec(
            Vec3::new(0.1 * k, -0.2, 0.05),
            Vec3::new(k, 2.0, 30.0 + k),
        )
    }

    #[test]
    fn appends_two_lines_per_pose() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.txt");
        let mut log = PoseLog::create(&path).unwrap();
        log.append(&pose(1.0)).unwrap();
        log.append(&pose(2.0)).unwrap();
        assert_eq!(log.entries(), 2);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert_eq!(text.lines().nth(1).unwrap(), "1 2 31");

        let back = read_pose_log(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back[1].rotation_angle_to(&pose(2.0)) < 1e-12);
        assert!(back[1].translation_distance_to(&pose(2.0)) < 1e-12);
    }

    #[test]
    fn append_to_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poses.txt");
        PoseLog::create(&path).unwrap().append(&pose(1.0)).unwrap();
        PoseLog::append_to(&path).unwrap().append(&pose(3.0)).unwrap();
        assert_eq!(read_pose_log(&path).unwrap().len(), 2);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(matches!(
            parse_pose_log("0 0 0\n1 2\n"),
            Err(PoseLogError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            parse_pose_log("0 0 0\n1 2 3\n0 0 0\n"),
            Err(PoseLogError::Truncated)
        ));
        assert!(parse_pose_log("").unwrap().is_empty());
    }
}
