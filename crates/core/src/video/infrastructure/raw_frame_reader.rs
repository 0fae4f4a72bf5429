use std::io::{ErrorKind, Read};

use crate::shared::error::TaggerError;
use crate::shared::frame::Frame;
use crate::shared::video_geometry::VideoGeometry;

/// Splits a raw RGB24 byte stream into frames of a fixed size.
///
/// Reads until a whole frame is buffered or the stream ends. Any shortfall,
/// including zero bytes, ends the stream; trailing bytes are discarded.
pub struct RawFrameReader<R> {
    inner: R,
    width: u32,
    height: u32,
    frame_size: usize,
    next_index: usize,
    finished: bool,
}

impl<R: Read> RawFrameReader<R> {
    pub fn new(inner: R, geometry: &VideoGeometry) -> Self {
        Self {
            inner,
            width: geometry.width,
            height: geometry.height,
            frame_size: geometry.frame_size(),
            next_index: 0,
            finished: false,
        }
    }

    pub fn read_frame(&mut self) -> Result<Option<Frame>, TaggerError> {
        Ok(self.read_bytes()?.map(|data| {
            let frame = Frame::new(data, self.width, self.height, self.next_index);
            self.next_index += 1;
            frame
        }))
    }

    /// Reads one frame's worth of bytes without wrapping them in a [`Frame`].
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>, TaggerError> {
        if self.finished || self.frame_size == 0 {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_size];
        let mut filled = 0;
        while filled < self.frame_size {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(TaggerError::DecoderStream(e.to_string()));
                }
            }
        }

        if filled < self.frame_size {
            if filled > 0 {
                log::debug!(
                    "Discarding {filled} trailing bytes (frame size {})",
                    self.frame_size
                );
            }
            self.finished = true;
            return Ok(None);
        }
        Ok(Some(buf))
    }
}
