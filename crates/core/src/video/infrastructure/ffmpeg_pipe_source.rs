use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};

use crate::shared::error::TaggerError;
use crate::shared::frame::Frame;
use crate::shared::video_geometry::VideoGeometry;
use crate::video::domain::frame_source::FrameSource;
use crate::video::infrastructure::hwaccel::HwAccel;
use crate::video::infrastructure::raw_frame_reader::RawFrameReader;

type FrameBytes = Result<Option<Vec<u8>>, TaggerError>;

enum FramePipe {
    /// Reads straight from the decoder's stdout on the pipeline thread.
    Blocking(RawFrameReader<ChildStdout>),
    /// A reader thread hands over one frame at a time so waits can time out.
    Threaded {
        frames: Receiver<FrameBytes>,
        timeout: Duration,
    },
}

/// Decodes a video by running an `ffmpeg` executable and reading raw RGB24
/// frames from its stdout.
///
/// The decoder writes ahead only as far as the pipe buffer allows, so a slow
/// consumer throttles it.
pub struct FfmpegPipeSource {
    ffmpeg_path: PathBuf,
    hwaccel: HwAccel,
    read_timeout: Option<Duration>,
    child: Option<Child>,
    pipe: Option<FramePipe>,
    geometry: Option<VideoGeometry>,
    next_index: usize,
}

impl FfmpegPipeSource {
    pub fn new(ffmpeg_path: impl Into<PathBuf>, hwaccel: HwAccel) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            hwaccel,
            read_timeout: None,
            child: None,
            pipe: None,
            geometry: None,
            next_index: 0,
        }
    }

    /// Fails the stream when no full frame arrives within `timeout`.
    ///
    /// Without a timeout a hung decoder stalls the run indefinitely.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Decoder arguments. The output size is pinned to `geometry` so every
    /// frame is exactly `geometry.frame_size()` bytes.
    pub fn decoder_args(&self, path: &Path, geometry: &VideoGeometry) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(OsString::from)
            .collect();
        args.extend(self.hwaccel.decoder_args().iter().map(OsString::from));
        args.push("-i".into());
        args.push(path.as_os_str().to_os_string());
        args.push("-vf".into());
        args.push(format!("scale={}:{}", geometry.width, geometry.height).into());
        for arg in ["-f", "rawvideo", "-pix_fmt", "rgb24", "-"] {
            args.push(arg.into());
        }
        args
    }

    fn spawn_reader_thread(
        mut reader: RawFrameReader<ChildStdout>,
        timeout: Duration,
    ) -> Result<FramePipe, TaggerError> {
        // Capacity 1 keeps at most one decoded frame queued ahead of the
        // pipeline; the pipe buffer provides the rest of the backpressure.
        let (tx, rx) = bounded(1);
        thread::Builder::new()
            .name("ffmpeg-frame-reader".into())
            .spawn(move || loop {
                let result = reader.read_bytes();
                let last = !matches!(result, Ok(Some(_)));
                if tx.send(result).is_err() || last {
                    break;
                }
            })
            .map_err(|e| TaggerError::DecoderStream(format!("cannot start reader thread: {e}")))?;
        Ok(FramePipe::Threaded {
            frames: rx,
            timeout,
        })
    }

    fn next_bytes(&mut self) -> FrameBytes {
        match self.pipe.as_mut() {
            None => Ok(None),
            Some(FramePipe::Blocking(reader)) => reader.read_bytes(),
            Some(FramePipe::Threaded { frames, timeout }) => match frames.recv_timeout(*timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Disconnected) => Ok(None),
                Err(RecvTimeoutError::Timeout) => Err(TaggerError::DecoderStream(format!(
                    "no frame received within {:.1}s",
                    timeout.as_secs_f64()
                ))),
            },
        }
    }
}

impl FrameSource for FfmpegPipeSource {
    fn open(&mut self, path: &Path, geometry: &VideoGeometry) -> Result<(), TaggerError> {
        self.close();

        let args = self.decoder_args(path, geometry);
        log::debug!(
            "Launching decoder: {} {}",
            self.ffmpeg_path.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| TaggerError::DecoderLaunch {
                program: self.ffmpeg_path.clone(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(TaggerError::DecoderStream(
                "decoder stdout was not captured".into(),
            ));
        };
        let reader = RawFrameReader::new(stdout, geometry);

        let pipe = match self.read_timeout {
            None => FramePipe::Blocking(reader),
            Some(timeout) => match Self::spawn_reader_thread(reader, timeout) {
                Ok(pipe) => pipe,
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e);
                }
            },
        };

        log::info!(
            "Decoder started (hwaccel: {}, {}x{} rgb24)",
            self.hwaccel,
            geometry.width,
            geometry.height
        );
        self.child = Some(child);
        self.pipe = Some(pipe);
        self.geometry = Some(*geometry);
        self.next_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, TaggerError> {
        let Some(geometry) = self.geometry else {
            return Err(TaggerError::DecoderStream("frame source not opened".into()));
        };
        let Some(data) = self.next_bytes()? else {
            return Ok(None);
        };
        let frame = Frame::new(data, geometry.width, geometry.height, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        // Dropping the pipe first unblocks a reader thread parked on send.
        self.pipe = None;
        self.geometry = None;

        let Some(mut child) = self.child.take() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(status)) => log::debug!("Decoder already exited with {status}"),
            _ => {
                if let Err(e) = child.kill() {
                    log::debug!("Decoder kill failed: {e}");
                }
                let _ = child.wait();
            }
        }
    }
}

impl Drop for FfmpegPipeSource {
    fn drop(&mut self) {
        self.close();
    }
}
