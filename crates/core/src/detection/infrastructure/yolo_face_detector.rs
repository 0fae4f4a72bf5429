/// YOLO face detector running on ONNX Runtime.
///
/// Letterboxes the frame to the model's square input, filters candidates by
/// confidence, suppresses overlaps and maps boxes and facial keypoints back
/// to frame pixels.
use std::path::Path;

use crate::detection::domain::detected_face::BoundingBox;
use crate::detection::infrastructure::execution_provider::build_session;
use crate::detection::infrastructure::math::bbox_iou;
use crate::shared::frame::Frame;

/// Used when the model input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Pose heads append 5 keypoints as `(x, y, conf)` after the box and score.
const NUM_KEYPOINTS: usize = 5;
const KEYPOINT_FEATURES: usize = NUM_KEYPOINTS * 3;

/// Keypoints below this confidence are treated as not visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Gray fill for letterbox padding.
const PAD_VALUE: f32 = 114.0 / 255.0;

/// A detected face box in frame coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceBox {
    /// `[x1, y1, x2, y2]` in frame pixels, unclamped.
    pub bbox: [f64; 4],
    pub confidence: f64,
    /// Eyes, nose tip and mouth corners in frame pixels, present only when
    /// the model emits them and all five are visible.
    pub keypoints: Option<[[f64; 2]; NUM_KEYPOINTS]>,
}

impl FaceBox {
    /// Rounds outward-facing corners to integers and clamps to the frame.
    pub fn to_bounding_box(&self, width: u32, height: u32) -> BoundingBox {
        BoundingBox::new(
            self.bbox[0].floor() as i32,
            self.bbox[1].floor() as i32,
            self.bbox[2].ceil() as i32,
            self.bbox[3].ceil() as i32,
        )
        .clamped(width, height)
    }
}

pub struct YoloFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl YoloFaceDetector {
    /// Loads the model. The input resolution comes from the model's NCHW
    /// input shape when it is static.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let letterboxed = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(letterboxed.tensor.clone())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face detector produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = parse_candidates(data, &shape, self.confidence)?;
        for candidate in &mut candidates {
            candidate.bbox = letterboxed.to_frame(candidate.bbox);
            if let Some(points) = candidate.keypoints.as_mut() {
                for point in points.iter_mut() {
                    *point = letterboxed.point_to_frame(*point);
                }
            }
        }
        Ok(nms(candidates, NMS_IOU_THRESH))
    }
}

/// Decodes rows of `[cx, cy, w, h, conf, (kx, ky, kconf) x 5?]` from a
/// `[1, F, N]` or `[1, N, F]` output, keeping rows at or above
/// `min_confidence`.
fn parse_candidates(
    data: &[f32],
    shape: &[usize],
    min_confidence: f64,
) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected detector output shape: {shape:?}").into());
    }
    // Feature count is always the smaller axis.
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Ok(Vec::new());
    }

    let at = |det: usize, feat: usize| -> f64 {
        let i = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[i] as f64
    };

    let mut out = Vec::new();
    for det in 0..num_dets {
        let confidence = at(det, 4);
        if confidence < min_confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(det, 0), at(det, 1), at(det, 2), at(det, 3));
        let keypoints = if num_feats >= 5 + KEYPOINT_FEATURES {
            visible_keypoints(|k| [at(det, 5 + k * 3), at(det, 6 + k * 3), at(det, 7 + k * 3)])
        } else {
            None
        };
        out.push(FaceBox {
            bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            confidence,
            keypoints,
        });
    }
    Ok(out)
}

/// All five keypoints, or `None` if any falls below the visibility threshold.
fn visible_keypoints(
    keypoint: impl Fn(usize) -> [f64; 3],
) -> Option<[[f64; 2]; NUM_KEYPOINTS]> {
    let mut points = [[0.0; 2]; NUM_KEYPOINTS];
    for (k, point) in points.iter_mut().enumerate() {
        let [x, y, conf] = keypoint(k);
        if conf < KEYPOINT_CONF_THRESH {
            return None;
        }
        *point = [x, y];
    }
    Some(points)
}

struct Letterboxed {
    tensor: ndarray::Array4<f32>,
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterboxed {
    fn to_frame(&self, b: [f64; 4]) -> [f64; 4] {
        [
            (b[0] - self.pad_x) / self.scale,
            (b[1] - self.pad_y) / self.scale,
            (b[2] - self.pad_x) / self.scale,
            (b[3] - self.pad_y) / self.scale,
        ]
    }

    fn point_to_frame(&self, p: [f64; 2]) -> [f64; 2] {
        [(p[0] - self.pad_x) / self.scale, (p[1] - self.pad_y) / self.scale]
    }
}

/// Nearest-neighbor resize into a centered `target` x `target` canvas,
/// normalized to [0, 1], NCHW.
fn letterbox(frame: &Frame, target: u32) -> Letterboxed {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let scale = (target as f64 / fw).min(target as f64 / fh);
    let new_w = ((fw * scale).round() as u32).min(target);
    let new_h = ((fh * scale).round() as u32).min(target);
    let pad_x = (target - new_w) / 2;
    let pad_y = (target - new_h) / 2;

    let size = target as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), PAD_VALUE);

    let src = frame.as_ndarray();
    let max_y = frame.height() as usize - 1;
    let max_x = frame.width() as usize - 1;
    for y in 0..new_h as usize {
        let sy = ((y as f64 / scale) as usize).min(max_y);
        for x in 0..new_w as usize {
            let sx = ((x as f64 / scale) as usize).min(max_x);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    Letterboxed {
        tensor,
        scale,
        pad_x: pad_x as f64,
        pad_y: pad_y as f64,
    }
}

/// Greedy NMS: highest confidence first, drop boxes overlapping a kept one.
fn nms(mut boxes: Vec<FaceBox>, iou_thresh: f64) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut keep: Vec<FaceBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep
            .iter()
            .all(|k| bbox_iou(&k.bbox, &candidate.bbox) <= iou_thresh)
        {
            keep.push(candidate);
        }
    }
    keep
}
