use ndarray::ArrayView3;

use crate::shared::constants::BYTES_PER_PIXEL;

/// One decoded frame: packed RGB24, row-major, no row padding.
///
/// Owned by the pipeline loop for a single iteration. Consumers only get
/// shared references, so detection never sees an annotated buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        assert_eq!(
            data.len(),
            Self::byte_len(width, height),
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    /// Size in bytes of one frame with the given dimensions.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Zero-based position in decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// `(height, width, channel)` view over the pixel data.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, BYTES_PER_PIXEL),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}
