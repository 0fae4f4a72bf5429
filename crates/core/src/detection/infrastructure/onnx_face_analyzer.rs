use std::path::Path;

use crate::detection::domain::detected_face::DetectedFace;
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::detection::infrastructure::arcface_embedder::ArcFaceEmbedder;
use crate::detection::infrastructure::yolo_face_detector::YoloFaceDetector;
use crate::shared::frame::Frame;

/// Two-stage analyzer: YOLO finds faces and their keypoints, ArcFace embeds
/// each aligned face.
pub struct OnnxFaceAnalyzer {
    detector: YoloFaceDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceAnalyzer {
    pub fn new(
        detector_model: &Path,
        embedder_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        log::info!("Loading face detector from {}", detector_model.display());
        let detector = YoloFaceDetector::new(detector_model, confidence)?;
        log::info!("Loading face embedder from {}", embedder_model.display());
        let embedder = ArcFaceEmbedder::new(embedder_model)?;
        Ok(Self { detector, embedder })
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        let boxes = self.detector.detect(frame)?;
        let mut faces = Vec::with_capacity(boxes.len());
        for face_box in &boxes {
            let bounding_box = face_box.to_bounding_box(frame.width(), frame.height());
            // Boxes entirely outside the frame clamp to nothing.
            if bounding_box.is_empty() {
                continue;
            }
            let embedding = self
                .embedder
                .embed(frame, &bounding_box, face_box.keypoints.as_ref())?;
            faces.push(DetectedFace {
                bounding_box,
                embedding,
            });
        }
        Ok(faces)
    }

    fn embedding_dimension(&self) -> Option<usize> {
        self.embedder.dimension()
    }
}
