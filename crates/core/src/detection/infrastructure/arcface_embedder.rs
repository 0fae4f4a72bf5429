/// ArcFace face embedder using ONNX Runtime.
///
/// Warps each face onto the five-point template when keypoints are known,
/// otherwise takes a square crop around its box. The 112x112 result is
/// embedded and returned raw. Normalization is left to the caller.
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbImage};

use crate::detection::domain::detected_face::BoundingBox;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::detection::infrastructure::face_alignment::{align_face, ALIGNED_SIZE};
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = ALIGNED_SIZE;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: ort::session::Session,
    dimension: Option<usize>,
}

impl ArcFaceEmbedder {
    /// Loads the model. The embedding length is read from the last axis of
    /// its output shape when that axis is static.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        let dimension = session
            .outputs()
            .first()
            .and_then(|output| match output.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 2 && shape[shape.len() - 1] > 0 =>
                {
                    Some(shape[shape.len() - 1] as usize)
                }
                _ => None,
            });
        Ok(Self { session, dimension })
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn embed(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
        keypoints: Option<&[[f64; 2]; 5]>,
    ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let aligned = keypoints.and_then(|points| align_face(frame, points));
        let crop = match aligned {
            Some(face) => face,
            None => square_crop(frame, bbox).ok_or("face crop is empty")?,
        };
        let tensor = preprocess(&crop);
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face embedder produced no outputs".into());
        }
        let embedding = outputs[0].try_extract_array::<f32>()?;
        Ok(embedding.iter().copied().collect())
    }
}

/// Square region centered on `bbox` with side equal to its longer edge,
/// shifted and clipped to stay inside the frame.
fn square_region(bbox: &BoundingBox, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if bbox.is_empty() || width == 0 || height == 0 {
        return None;
    }
    let side = bbox.width().max(bbox.height()).min(width.min(height) as i32);
    let cx = (bbox.x0 + bbox.x1) / 2;
    let cy = (bbox.y0 + bbox.y1) / 2;
    let x = (cx - side / 2).clamp(0, width as i32 - side);
    let y = (cy - side / 2).clamp(0, height as i32 - side);
    Some((x as u32, y as u32, side as u32, side as u32))
}

fn square_crop(frame: &Frame, bbox: &BoundingBox) -> Option<RgbImage> {
    let (x, y, w, h) = square_region(bbox, frame.width(), frame.height())?;
    let view: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())?;
    Some(imageops::crop_imm(&view, x, y, w, h).to_image())
}

/// Resize to 112x112 if needed, normalize to [-1, 1], NCHW layout.
fn preprocess(crop: &RgbImage) -> ndarray::Array4<f32> {
    let resized;
    let input = if crop.dimensions() == (INPUT_SIZE, INPUT_SIZE) {
        crop
    } else {
        resized = imageops::resize(crop, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
        &resized
    };
    let size = INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in input.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - NORM_MEAN) / NORM_STD;
        }
    }
    tensor
}
