use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::shared::error::TaggerError;
use crate::video::domain::media_probe::{MediaProbe, StreamInfo};

/// Probes the first video stream by running an `ffprobe` executable.
pub struct FfprobeProbe {
    ffprobe_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    /// ffprobe reports counts as strings, sometimes `"N/A"`.
    nb_frames: Option<String>,
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<Vec<u8>, TaggerError> {
        let output = Command::new(&self.ffprobe_path)
            .args(args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                TaggerError::media_probe(
                    path,
                    format!("cannot run {}: {e}", self.ffprobe_path.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TaggerError::media_probe(
                path,
                format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(output.stdout)
    }
}

impl MediaProbe for FfprobeProbe {
    fn stream_info(&self, path: &Path) -> Result<StreamInfo, TaggerError> {
        let stdout = self.run(
            path,
            &[
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,nb_frames",
                "-of",
                "json",
            ],
        )?;
        parse_stream_info(&stdout).map_err(|m| TaggerError::media_probe(path, m))
    }

    fn count_frames(&self, path: &Path) -> Result<usize, TaggerError> {
        let stdout = self.run(
            path,
            &[
                "-v",
                "error",
                "-count_frames",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=nb_read_frames",
                "-of",
                "default=nokey=1:noprint_wrappers=1",
            ],
        )?;
        parse_frame_count(&String::from_utf8_lossy(&stdout))
            .ok_or_else(|| TaggerError::media_probe(path, "ffprobe returned no frame count"))
    }
}

fn parse_stream_info(stdout: &[u8]) -> Result<StreamInfo, String> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid ffprobe output: {e}"))?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or("no video stream found")?;

    let width = stream.width.ok_or("video stream has no width")?;
    let height = stream.height.ok_or("video stream has no height")?;
    let frame_count = stream.nb_frames.as_deref().and_then(parse_frame_count);

    Ok(StreamInfo {
        width,
        height,
        frame_count,
    })
}

/// Parses a frame count, treating `N/A`, empty and zero as unknown.
fn parse_frame_count(text: &str) -> Option<usize> {
    text.lines()
        .next()
        .and_then(|line| line.trim().parse::<usize>().ok())
        .filter(|&count| count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_stream_info_with_frame_count() {
        let json = br#"{"programs":[],"streams":[{"width":1920,"height":1080,"nb_frames":"1441"}]}"#;
        let info = parse_stream_info(json).unwrap();
        assert_eq!(
            info,
            StreamInfo {
                width: 1920,
                height: 1080,
                frame_count: Some(1441)
            }
        );
    }

    #[test]
    fn test_parse_stream_info_without_frame_count() {
        let json = br#"{"streams":[{"width":1280,"height":720}]}"#;
        let info = parse_stream_info(json).unwrap();
        assert_eq!(info.frame_count, None);
        assert_eq!(info.width, 1280);
    }

    #[test]
    fn test_parse_stream_info_na_frame_count_is_unknown() {
        let json = br#"{"streams":[{"width":1280,"height":720,"nb_frames":"N/A"}]}"#;
        assert_eq!(parse_stream_info(json).unwrap().frame_count, None);
    }

    #[test]
    fn test_parse_stream_info_no_streams() {
        let err = parse_stream_info(br#"{"streams":[]}"#).unwrap_err();
        assert!(err.contains("no video stream"));
    }

    #[test]
    fn test_parse_stream_info_not_json() {
        assert!(parse_stream_info(b"moov atom not found").is_err());
    }

    #[rstest]
    #[case::plain("250\n", Some(250))]
    #[case::padded("  42  ", Some(42))]
    #[case::not_available("N/A\n", None)]
    #[case::empty("", None)]
    #[case::zero("0\n", None)]
    fn test_parse_frame_count(#[case] text: &str, #[case] expected: Option<usize>) {
        assert_eq!(parse_frame_count(text), expected);
    }

    #[test]
    fn test_missing_executable_is_probe_error() {
        let probe = FfprobeProbe::new("/nonexistent/bin/ffprobe");
        let err = probe.stream_info(Path::new("video.mp4")).unwrap_err();
        assert!(matches!(err, TaggerError::MediaProbe { .. }));
    }
}
