use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors of a tagging run.
///
/// None of these leave a usable partial result: the caller reports the
/// message and exits without emitting the identity list.
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("failed to load gallery from {path}: {message}")]
    GalleryLoad { path: PathBuf, message: String },

    #[error("failed to probe {path}: {message}")]
    MediaProbe { path: PathBuf, message: String },

    #[error("failed to launch decoder {program}: {source}")]
    DecoderLaunch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decoder stream failed: {0}")]
    DecoderStream(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("face analysis failed on frame {frame}: {message}")]
    FrameAnalysis { frame: usize, message: String },

    #[error("embedding has {actual} dimensions but the gallery expects {expected}")]
    EmbeddingDimension { expected: usize, actual: usize },

    #[error("preview failed: {0}")]
    Preview(String),

    #[error("failed to write status line: {0}")]
    Status(#[source] std::io::Error),
}

impl TaggerError {
    pub fn gallery_load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::GalleryLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn media_probe(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::MediaProbe {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_load_message_names_file() {
        let err = TaggerError::gallery_load("/data/names.json", "expected array");
        assert_eq!(
            err.to_string(),
            "failed to load gallery from /data/names.json: expected array"
        );
    }

    #[test]
    fn test_decoder_launch_keeps_io_source() {
        let err = TaggerError::DecoderLaunch {
            program: PathBuf::from("/usr/bin/ffmpeg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("/usr/bin/ffmpeg"));
    }

    #[test]
    fn test_embedding_dimension_message() {
        let err = TaggerError::EmbeddingDimension {
            expected: 512,
            actual: 128,
        };
        assert_eq!(
            err.to_string(),
            "embedding has 128 dimensions but the gallery expects 512"
        );
    }
}
