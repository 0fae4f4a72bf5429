use std::path::Path;

use crate::shared::error::TaggerError;

/// Stream metadata from a cheap probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Absent when the container does not record a frame count.
    pub frame_count: Option<usize>,
}

/// Reads video stream metadata without decoding the whole file.
pub trait MediaProbe: Send {
    fn stream_info(&self, path: &Path) -> Result<StreamInfo, TaggerError>;

    /// Exact frame count by decoding every frame. Slow.
    fn count_frames(&self, path: &Path) -> Result<usize, TaggerError>;
}
