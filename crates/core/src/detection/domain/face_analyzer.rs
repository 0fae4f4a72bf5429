use crate::detection::domain::detected_face::DetectedFace;
use crate::shared::frame::Frame;

/// Finds faces in a frame and computes one raw embedding per face.
///
/// Embeddings are returned as produced by the model; callers normalize.
/// `&mut self` because inference sessions need exclusive access.
pub trait FaceAnalyzer: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>>;

    /// Length of the embeddings this analyzer produces, when known up front.
    fn embedding_dimension(&self) -> Option<usize> {
        None
    }
}
