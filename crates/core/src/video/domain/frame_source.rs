use std::path::Path;

use crate::shared::error::TaggerError;
use crate::shared::frame::Frame;
use crate::shared::video_geometry::VideoGeometry;

/// Pull-based source of fixed-size decoded frames.
///
/// Implementations own whatever produces the bytes (typically a decoder
/// subprocess) and must release it in `close`, which may be called more
/// than once and on any exit path.
pub trait FrameSource: Send {
    /// Starts producing frames of exactly `geometry.frame_size()` bytes.
    fn open(&mut self, path: &Path, geometry: &VideoGeometry) -> Result<(), TaggerError>;

    /// Returns the next frame, or `None` once the stream is exhausted.
    ///
    /// A short read is the end of the stream, never a partial frame.
    fn next_frame(&mut self) -> Result<Option<Frame>, TaggerError>;

    /// Releases the producer. Safe to call repeatedly.
    fn close(&mut self);
}
