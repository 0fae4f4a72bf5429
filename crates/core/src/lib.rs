//! Streams decoded video frames through face detection and matches every
//! face against a gallery of known identities.

pub mod detection;
pub mod gallery;
pub mod pipeline;
pub mod preview;
pub mod recognition;
pub mod shared;
pub mod video;
