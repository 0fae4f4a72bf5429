use std::time::Duration;

use crate::shared::constants::{
    DEFAULT_FRAME_STRIDE, DEFAULT_RECOGNITION_THRESHOLD, DEFAULT_RESIZE_WIDTH,
    PROGRESS_INTERVAL_FRAMES,
};
use crate::shared::error::TaggerError;

/// Settings for one tagging run.
#[derive(Clone, Debug, PartialEq)]
pub struct TaggerConfig {
    /// Analyze frames whose 1-based position is a multiple of this.
    pub frame_stride: usize,
    /// Decode width; 0 keeps the source size.
    pub resize_width: u32,
    /// Accept a gallery match when its distance is strictly below this.
    pub recognition_threshold: f32,
    /// Consumed frames between progress lines.
    pub progress_interval: usize,
    /// `None` blocks on the decoder indefinitely.
    pub read_timeout: Option<Duration>,
    pub preview: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            frame_stride: DEFAULT_FRAME_STRIDE,
            resize_width: DEFAULT_RESIZE_WIDTH,
            recognition_threshold: DEFAULT_RECOGNITION_THRESHOLD,
            progress_interval: PROGRESS_INTERVAL_FRAMES,
            read_timeout: None,
            preview: false,
        }
    }
}

impl TaggerConfig {
    pub fn validate(&self) -> Result<(), TaggerError> {
        if self.frame_stride < 1 {
            return Err(TaggerError::Config(format!(
                "frame stride must be at least 1, got {}",
                self.frame_stride
            )));
        }
        if self.progress_interval < 1 {
            return Err(TaggerError::Config(
                "progress interval must be at least 1".into(),
            ));
        }
        if !self.recognition_threshold.is_finite() || self.recognition_threshold <= 0.0 {
            return Err(TaggerError::Config(format!(
                "recognition threshold must be a positive number, got {}",
                self.recognition_threshold
            )));
        }
        if self.read_timeout == Some(Duration::ZERO) {
            return Err(TaggerError::Config("read timeout must be positive".into()));
        }
        Ok(())
    }

    /// Whether the frame at 1-based position `frame_number` is analyzed.
    pub fn accepts(&self, frame_number: usize) -> bool {
        frame_number % self.frame_stride == 0
    }
}
