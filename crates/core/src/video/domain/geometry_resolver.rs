use std::path::Path;

use crate::shared::error::TaggerError;
use crate::shared::video_geometry::VideoGeometry;
use crate::video::domain::media_probe::MediaProbe;

/// Resolves output geometry for `path`, falling back to an exact frame count
/// when the container does not expose one.
///
/// Probe failure is fatal. A failed or empty exact count is not: the run
/// continues with `total_frames == 0` and percentage progress disabled.
pub fn resolve_geometry(
    probe: &dyn MediaProbe,
    path: &Path,
    requested_width: u32,
) -> Result<VideoGeometry, TaggerError> {
    let info = probe.stream_info(path)?;
    if info.width == 0 || info.height == 0 {
        return Err(TaggerError::media_probe(
            path,
            format!("invalid dimensions {}x{}", info.width, info.height),
        ));
    }

    let total_frames = match info.frame_count {
        Some(count) => count,
        None => {
            log::info!("Frame count not in container metadata, counting frames");
            match probe.count_frames(path) {
                Ok(count) => count,
                Err(e) => {
                    log::warn!("Exact frame count failed: {e}");
                    0
                }
            }
        }
    };

    let geometry = VideoGeometry::scaled(info.width, info.height, total_frames, requested_width);
    if !geometry.has_frame_count() {
        log::warn!("Could not determine total frames; progress percentages are disabled");
    }
    log::info!(
        "Source {}x{} -> decoding at {}x{}, {} frames",
        info.width,
        info.height,
        geometry.width,
        geometry.height,
        geometry.total_frames
    );
    Ok(geometry)
}
