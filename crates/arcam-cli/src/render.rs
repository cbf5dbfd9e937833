//! Raster renderer: marks detected points, draws overlay segments into the
//! frame and writes it next to the other outputs as `output_<name>`.

use crate::source::LoadedImage;
use anyhow::{anyhow, Context, Result};
use arcam_core::{Pt2, Rgb};
use arcam_pipeline::Renderer;
use image::{Rgb as Pixel, RgbImage};
use log::debug;
use std::path::PathBuf;

/// Longest segment drawn, in pixels along the major axis. Projections that
/// explode near the image plane are skipped instead of rasterised.
const MAX_SEGMENT_PX: f64 = 1.0e5;

pub struct ImageWriter {
    out_dir: PathBuf,
    thickness: u32,
    current: Option<LoadedImage>,
    written: Vec<PathBuf>,
}

impl ImageWriter {
    pub fn new(out_dir: PathBuf, thickness: u32) -> Self {
        Self {
            out_dir,
            thickness: thickness.max(1),
            current: None,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl Renderer<LoadedImage> for ImageWriter {
    fn begin_frame(&mut self, frame: LoadedImage) {
        self.current = Some(frame);
    }

    fn draw_point(&mut self, p: Pt2, color: Rgb) {
        if let Some(frame) = self.current.as_mut() {
            draw_marker(&mut frame.image, p, Pixel(color), self.thickness);
        }
    }

    fn draw_segment(&mut self, from: Pt2, to: Pt2, color: Rgb) {
        if let Some(frame) = self.current.as_mut() {
            draw_line_thick(&mut frame.image, from, to, Pixel(color), self.thickness);
        }
    }

    fn commit_frame(&mut self) -> Result<()> {
        let frame = self
            .current
            .take()
            .ok_or_else(|| anyhow!("commit without an open frame"))?;
        let path = self.out_dir.join(format!("output_{}", frame.name));
        frame
            .image
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("wrote {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

/// Filled square of side `2 * radius + 1` centred on `p`.
pub fn draw_marker(img: &mut RgbImage, p: Pt2, color: Pixel<u8>, radius: u32) {
    if !(p.x.is_finite() && p.y.is_finite()) {
        return;
    }
    paint_brush(img, p.x.round() as i64, p.y.round() as i64, color, 2 * radius + 1);
}

/// Bresenham line with a square brush of side `thickness`.
pub fn draw_line_thick(img: &mut RgbImage, from: Pt2, to: Pt2, color: Pixel<u8>, thickness: u32) {
    if !(from.x.is_finite() && from.y.is_finite() && to.x.is_finite() && to.y.is_finite()) {
        return;
    }
    if (to.x - from.x).abs().max((to.y - from.y).abs()) > MAX_SEGMENT_PX {
        return;
    }
    let (mut x0, mut y0) = (from.x.round() as i64, from.y.round() as i64);
    let (x1, y1) = (to.x.round() as i64, to.y.round() as i64);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        paint_brush(img, x0, y0, color, thickness);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn paint_brush(img: &mut RgbImage, x: i64, y: i64, color: Pixel<u8>, thickness: u32) {
    let lo = -((thickness as i64 - 1) / 2);
    let hi = lo + thickness as i64 - 1;
    for dy in lo..=hi {
        for dx in lo..=hi {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u64) < img.width() as u64 && (py as u64) < img.height() as u64
            {
                img.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}
