use std::fmt;

use crate::detection::domain::detected_face::BoundingBox;
use crate::shared::constants::UNKNOWN_IDENTITY;

/// Outcome of matching one face against the gallery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    Known(String),
    Unknown,
}

impl Identity {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Known(name) => Some(name),
            Self::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => f.write_str(name),
            Self::Unknown => f.write_str(UNKNOWN_IDENTITY),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Distance to the nearest gallery entry; infinite for an empty gallery.
    pub distance: f32,
    pub identity: Identity,
}

/// A face located in a frame and the identity it resolved to.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedFace {
    pub bounding_box: BoundingBox,
    pub result: MatchResult,
}
