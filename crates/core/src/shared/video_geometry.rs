use crate::shared::frame::Frame;

/// Output frame dimensions and expected frame count for one run.
///
/// `total_frames == 0` means the count is unknown: decoding still works,
/// only percentage progress is unavailable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
    pub total_frames: usize,
}

impl VideoGeometry {
    /// Geometry after an optional downscale to `requested_width`.
    ///
    /// A width of 0 keeps the source size. Otherwise the height follows the
    /// source aspect ratio, rounded to the nearest pixel and never below 1.
    pub fn scaled(
        source_width: u32,
        source_height: u32,
        total_frames: usize,
        requested_width: u32,
    ) -> Self {
        if requested_width == 0 || source_width == 0 {
            return Self {
                width: source_width,
                height: source_height,
                total_frames,
            };
        }
        let height = (source_height as f64 * requested_width as f64 / source_width as f64)
            .round()
            .max(1.0) as u32;
        Self {
            width: requested_width,
            height,
            total_frames,
        }
    }

    pub fn frame_size(&self) -> usize {
        Frame::byte_len(self.width, self.height)
    }

    pub fn has_frame_count(&self) -> bool {
        self.total_frames > 0
    }
}
