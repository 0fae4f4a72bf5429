use std::path::Path;
use std::sync::Arc;

use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::detection::infrastructure::math::l2_normalize;
use crate::gallery::domain::gallery::Gallery;
use crate::recognition::identity_set::IdentitySet;
use crate::recognition::match_result::{Identity, MatchResult, RecognizedFace};
use crate::shared::error::TaggerError;
use crate::shared::frame::Frame;

/// Detects faces in a frame and names each one from the gallery.
pub struct RecognitionEngine {
    analyzer: Box<dyn FaceAnalyzer>,
    gallery: Arc<Gallery>,
    threshold: f32,
}

impl RecognitionEngine {
    pub fn new(analyzer: Box<dyn FaceAnalyzer>, gallery: Arc<Gallery>, threshold: f32) -> Self {
        Self {
            analyzer,
            gallery,
            threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Recognizes every face in `frame` and records known names in
    /// `identities`.
    ///
    /// An analyzer failure is fatal for the run.
    pub fn process(
        &mut self,
        frame: &Frame,
        identities: &mut IdentitySet,
    ) -> Result<Vec<RecognizedFace>, TaggerError> {
        let faces = self
            .analyzer
            .analyze(frame)
            .map_err(|e| TaggerError::FrameAnalysis {
                frame: frame.index() + 1,
                message: e.to_string(),
            })?;

        let mut recognized = Vec::with_capacity(faces.len());
        for face in faces {
            let result = match_embedding(&self.gallery, face.embedding, self.threshold)?;
            if let Identity::Known(name) = &result.identity {
                log::debug!(
                    "Frame {}: matched {name} at distance {:.3}",
                    frame.index() + 1,
                    result.distance
                );
                if identities.insert(name) {
                    log::info!("New identity found: {name}");
                }
            }
            recognized.push(RecognizedFace {
                bounding_box: face.bounding_box,
                result,
            });
        }
        Ok(recognized)
    }
}

/// Fails with `GalleryLoad` when the analyzer's embeddings cannot be
/// compared with the gallery loaded from `index_path`.
///
/// Analyzers that cannot tell their embedding length up front pass; the
/// per-face check in [`Gallery::nearest`] still applies.
pub fn ensure_gallery_fits(
    gallery: &Gallery,
    analyzer: &dyn FaceAnalyzer,
    index_path: &Path,
) -> Result<(), TaggerError> {
    match analyzer.embedding_dimension() {
        Some(produced) if produced != gallery.dimension() => Err(TaggerError::gallery_load(
            index_path,
            format!(
                "gallery vectors have dimension {} but the embedding model produces {produced}",
                gallery.dimension()
            ),
        )),
        _ => Ok(()),
    }
}

/// Unit-normalizes `embedding` and resolves it against the gallery.
///
/// The nearest entry is accepted only when its distance is strictly below
/// `threshold`.
pub fn match_embedding(
    gallery: &Gallery,
    mut embedding: Vec<f32>,
    threshold: f32,
) -> Result<MatchResult, TaggerError> {
    l2_normalize(&mut embedding);
    let result = match gallery.nearest(&embedding)? {
        Some(hit) if hit.distance < threshold => MatchResult {
            distance: hit.distance,
            identity: Identity::Known(hit.name.to_string()),
        },
        Some(hit) => MatchResult {
            distance: hit.distance,
            identity: Identity::Unknown,
        },
        None => MatchResult {
            distance: f32::INFINITY,
            identity: Identity::Unknown,
        },
    };
    Ok(result)
}
