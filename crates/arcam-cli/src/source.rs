//! Frames read from an image directory.

use anyhow::{Context, Result};
use arcam_core::ImageSize;
use arcam_pipeline::FrameSource;
use image::RgbImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];

/// A decoded frame and the file name it came from.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub name: String,
    pub image: RgbImage,
}

impl LoadedImage {
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Image files of a directory in file-name order. Unreadable images are
/// skipped with a warning.
#[derive(Debug)]
pub struct ImageDirectory {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageDirectory {
    pub fn open(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("cannot read image directory {}", dir.display()))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("cannot list {}", dir.display()))?
                .path();
            if !path.is_file() {
                continue;
            }
            if is_image(&path) {
                paths.push(path);
            } else {
                debug!("skipping non-image file {}", path.display());
            }
        }
        paths.sort();
        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageDirectory {
    type Frame = LoadedImage;

    fn next_frame(&mut self) -> Result<Option<LoadedImage>> {
        while let Some(path) = self.paths.get(self.next) {
            self.next += 1;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match image::open(path) {
                Ok(img) => {
                    return Ok(Some(LoadedImage {
                        name,
                        image: img.to_rgb8(),
                    }))
                }
                Err(err) => warn!("skipping unreadable image {}: {err}", path.display()),
            }
        }
        Ok(None)
    }
}
