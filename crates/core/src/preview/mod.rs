#[cfg(feature = "preview-window")]
pub mod highgui_preview;

use crate::pipeline::preview_sink::PreviewSink;
use crate::shared::error::TaggerError;

/// Whether this build can open a preview window.
pub const PREVIEW_AVAILABLE: bool = cfg!(feature = "preview-window");

/// Creates the on-screen preview, or a `Config` error when the build has
/// no window support.
pub fn open_preview() -> Result<Box<dyn PreviewSink>, TaggerError> {
    #[cfg(feature = "preview-window")]
    {
        Ok(Box::new(highgui_preview::HighguiPreview::new()))
    }
    #[cfg(not(feature = "preview-window"))]
    {
        Err(TaggerError::Config(
            "preview requested but this build has no window support \
             (rebuild with --features preview-window)"
                .into(),
        ))
    }
}
