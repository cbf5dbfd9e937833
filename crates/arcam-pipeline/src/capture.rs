//! Interactive sample capture, decoupled from how keys and frames arrive.

use crate::collector::{CornerObservationCollector, Rejected};
use arcam_core::{ObservationSet, Pt2};
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Save,
    Quit,
    Next,
}

impl CaptureCommand {
    /// `s` saves, `q` quits, any other key moves to the next frame.
    pub fn from_key(key: char) -> Self {
        match key.to_ascii_lowercase() {
            's' => CaptureCommand::Save,
            'q' => CaptureCommand::Quit,
            _ => CaptureCommand::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureEvent {
    Saved { count: usize },
    Rejected(Rejected),
    /// Save requested on a frame without a detection.
    NoDetection,
    Skipped,
    Quit,
}

#[derive(Debug, Clone)]
pub struct CaptureSession {
    collector: CornerObservationCollector,
}

impl CaptureSession {
    pub fn new(collector: CornerObservationCollector) -> Self {
        Self { collector }
    }

    pub fn collector(&self) -> &CornerObservationCollector {
        &self.collector
    }

    pub fn handle(&mut self, key: char, detection: Option<&[Pt2]>) -> CaptureEvent {
        match CaptureCommand::from_key(key) {
            CaptureCommand::Quit => CaptureEvent::Quit,
            CaptureCommand::Next => CaptureEvent::Skipped,
            CaptureCommand::Save => {
                let Some(corners) = detection else {
                    warn!("no checkerboard in this frame, nothing saved");
                    return CaptureEvent::NoDetection;
                };
                match self.collector.accept(corners) {
                    Ok(count) => {
                        info!("saved sample {count}");
                        CaptureEvent::Saved { count }
                    }
                    Err(reason) => {
                        warn!("sample rejected: {reason}");
                        CaptureEvent::Rejected(reason)
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Vec<ObservationSet> {
        self.collector.into_observations()
    }
}
