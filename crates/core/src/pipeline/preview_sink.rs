use crate::detection::domain::detected_face::BoundingBox;
use crate::recognition::match_result::RecognizedFace;
use crate::shared::frame::Frame;

pub const MATCHED_COLOR: [u8; 3] = [0, 255, 0];
pub const UNKNOWN_COLOR: [u8; 3] = [255, 0, 0];

/// Overlay for one face: its box and the label drawn above it.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceAnnotation {
    pub bounding_box: BoundingBox,
    pub label: String,
    pub matched: bool,
}

impl FaceAnnotation {
    /// RGB overlay color: green for a known identity, red otherwise.
    pub fn color(&self) -> [u8; 3] {
        if self.matched {
            MATCHED_COLOR
        } else {
            UNKNOWN_COLOR
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewAction {
    Continue,
    /// The user asked to stop the run.
    Quit,
}

/// Displays annotated frames and reports user cancellation.
///
/// Implementations draw on their own copy of the frame and must not block
/// waiting for input beyond a short poll.
pub trait PreviewSink: Send {
    fn render(
        &mut self,
        frame: &Frame,
        annotations: &[FaceAnnotation],
    ) -> Result<PreviewAction, Box<dyn std::error::Error>>;

    /// Releases the display. Safe to call more than once.
    fn close(&mut self);
}

pub fn annotations_for(faces: &[RecognizedFace]) -> Vec<FaceAnnotation> {
    faces
        .iter()
        .map(|face| FaceAnnotation {
            bounding_box: face.bounding_box,
            label: face.result.identity.to_string(),
            matched: face.result.identity.is_known(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::match_result::{Identity, MatchResult};

    fn recognized(identity: Identity) -> RecognizedFace {
        RecognizedFace {
            bounding_box: BoundingBox::new(1, 2, 3, 4),
            result: MatchResult {
                distance: 0.5,
                identity,
            },
        }
    }

    #[test]
    fn test_annotations_label_and_color() {
        let annotations = annotations_for(&[
            recognized(Identity::Known("Alice".into())),
            recognized(Identity::Unknown),
        ]);
        assert_eq!(annotations[0].label, "Alice");
        assert_eq!(annotations[0].color(), MATCHED_COLOR);
        assert_eq!(annotations[1].label, "Unknown");
        assert_eq!(annotations[1].color(), UNKNOWN_COLOR);
        assert_eq!(annotations[1].bounding_box, BoundingBox::new(1, 2, 3, 4));
    }
}
