use std::path::Path;
use std::time::Instant;

use crate::pipeline::pipeline_stats::PipelineStats;
use crate::pipeline::preview_sink::{annotations_for, PreviewAction, PreviewSink};
use crate::pipeline::progress_tracker::ProgressTracker;
use crate::pipeline::run_state::{RunState, StopReason};
use crate::pipeline::status_reporter::StatusReporter;
use crate::pipeline::tagger_config::TaggerConfig;
use crate::recognition::identity_set::IdentitySet;
use crate::recognition::recognition_engine::RecognitionEngine;
use crate::shared::error::TaggerError;
use crate::shared::video_geometry::VideoGeometry;
use crate::video::domain::frame_source::FrameSource;

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagOutcome {
    /// Sorted, distinct names of everyone recognized.
    pub identities: Vec<String>,
    pub frames_seen: usize,
    pub frames_analyzed: usize,
    pub stop_reason: StopReason,
}

/// Streams a video through face recognition and reports who appears in it.
///
/// Pulls frames one at a time from a [`FrameSource`], analyzes every
/// `frame_stride`-th one and reports progress and the final identity list
/// through a [`StatusReporter`]. An optional [`PreviewSink`] shows each
/// analyzed frame and can cancel the run between frames.
///
/// The frame source and preview are closed on every exit path. The result
/// line is only written when the run ends by exhaustion or cancellation.
pub struct TagVideoUseCase {
    engine: RecognitionEngine,
    status: Box<dyn StatusReporter>,
    preview: Option<Box<dyn PreviewSink>>,
    config: TaggerConfig,
}

impl TagVideoUseCase {
    pub fn new(
        engine: RecognitionEngine,
        status: Box<dyn StatusReporter>,
        preview: Option<Box<dyn PreviewSink>>,
        config: TaggerConfig,
    ) -> Result<Self, TaggerError> {
        config.validate()?;
        Ok(Self {
            engine,
            status,
            preview,
            config,
        })
    }

    pub fn execute(
        &mut self,
        input: &Path,
        geometry: &VideoGeometry,
        source: &mut dyn FrameSource,
    ) -> Result<TagOutcome, TaggerError> {
        if !geometry.has_frame_count() {
            log::warn!("Total frame count unknown; progress limited to start and end");
        }

        let mut tracker = ProgressTracker::new(geometry.total_frames, self.config.progress_interval);
        let mut state = RunState::new();
        let mut identities = IdentitySet::new();
        let mut stats = PipelineStats::new();

        let result = self.status.progress(tracker.start()).and_then(|()| {
            source.open(input, geometry)?;
            self.run_loop(source, &mut tracker, &mut state, &mut identities, &mut stats)
        });

        source.close();
        if let Some(preview) = self.preview.as_mut() {
            preview.close();
        }

        stats.set_frames(state.frames_seen);
        let stop_reason = match result {
            Ok(reason) => reason,
            Err(e) => {
                log::error!(
                    "Run aborted after {} frames ({} analyzed)",
                    state.frames_seen,
                    state.frames_analyzed
                );
                return Err(e);
            }
        };

        log::info!(
            "Finished ({stop_reason}): {} frames read, {} analyzed, {} identities",
            state.frames_seen,
            state.frames_analyzed,
            identities.len()
        );
        stats.log_summary();

        self.status.progress(tracker.finish())?;
        let names = identities.finalize();
        self.status.results(&names)?;

        Ok(TagOutcome {
            identities: names,
            frames_seen: state.frames_seen,
            frames_analyzed: state.frames_analyzed,
            stop_reason,
        })
    }

    fn run_loop(
        &mut self,
        source: &mut dyn FrameSource,
        tracker: &mut ProgressTracker,
        state: &mut RunState,
        identities: &mut IdentitySet,
        stats: &mut PipelineStats,
    ) -> Result<StopReason, TaggerError> {
        loop {
            if state.should_stop {
                return Ok(StopReason::Cancelled);
            }

            let t0 = Instant::now();
            let Some(frame) = source.next_frame()? else {
                return Ok(StopReason::Exhausted);
            };
            stats.timing("decode", t0.elapsed());

            state.frames_seen += 1;
            if let Some(percent) = tracker.on_frame(state.frames_seen) {
                self.status.progress(percent)?;
            }

            if !self.config.accepts(state.frames_seen) {
                continue;
            }

            let t0 = Instant::now();
            let faces = self.engine.process(&frame, identities)?;
            stats.timing("analyze", t0.elapsed());
            stats.metric("faces_per_frame", faces.len() as f64);
            state.frames_analyzed += 1;

            if let Some(preview) = self.preview.as_mut() {
                let t0 = Instant::now();
                let action = preview
                    .render(&frame, &annotations_for(&faces))
                    .map_err(|e| TaggerError::Preview(e.to_string()))?;
                stats.timing("preview", t0.elapsed());
                if action == PreviewAction::Quit {
                    log::info!("Quit requested from preview window");
                    state.request_stop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detected_face::{BoundingBox, DetectedFace};
    use crate::detection::domain::face_analyzer::FaceAnalyzer;
    use crate::gallery::domain::gallery::Gallery;
    use crate::gallery::infrastructure::flat_l2_index::FlatL2Index;
    use crate::pipeline::preview_sink::FaceAnnotation;
    use crate::pipeline::status_reporter::LineStatusReporter;
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::raw_frame_reader::RawFrameReader;
    use rstest::rstest;
    use std::io::{Cursor, Write};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const W: u32 = 4;
    const H: u32 = 4;

    // --- Stubs ---

    /// Status sink whose bytes stay readable after the use case owns it.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(String::from)
                .collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Serves an in-memory raw byte stream through the real framing reader.
    struct MemorySource {
        bytes: Vec<u8>,
        reader: Option<RawFrameReader<Cursor<Vec<u8>>>>,
        launch_fails: bool,
        closed: Arc<AtomicUsize>,
    }

    impl MemorySource {
        fn with_frames(count: usize) -> Self {
            Self {
                bytes: vec![0u8; count * Frame::byte_len(W, H)],
                reader: None,
                launch_fails: false,
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing_launch() -> Self {
            Self {
                launch_fails: true,
                ..Self::with_frames(0)
            }
        }
    }

    impl FrameSource for MemorySource {
        fn open(&mut self, _path: &Path, geometry: &VideoGeometry) -> Result<(), TaggerError> {
            if self.launch_fails {
                return Err(TaggerError::DecoderLaunch {
                    program: PathBuf::from("/missing/ffmpeg"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            self.reader = Some(RawFrameReader::new(Cursor::new(self.bytes.clone()), geometry));
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, TaggerError> {
            match self.reader.as_mut() {
                Some(reader) => reader.read_frame(),
                None => Err(TaggerError::DecoderStream("not opened".into())),
            }
        }

        fn close(&mut self) {
            self.reader = None;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Reports a face with `embedding` on 1-based frames in `frames`.
    struct ScriptedAnalyzer {
        frames: std::ops::RangeInclusive<usize>,
        embedding: Vec<f32>,
        calls: Arc<AtomicUsize>,
        fail_on: Option<usize>,
    }

    impl ScriptedAnalyzer {
        fn alice_in(frames: std::ops::RangeInclusive<usize>) -> Self {
            Self {
                frames,
                embedding: vec![3.0, 0.0],
                calls: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
            }
        }
    }

    impl FaceAnalyzer for ScriptedAnalyzer {
        fn analyze(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let number = frame.index() + 1;
            if self.fail_on == Some(number) {
                return Err("inference failed".into());
            }
            let mut faces = Vec::new();
            if self.frames.contains(&number) {
                faces.push(DetectedFace {
                    bounding_box: BoundingBox::new(0, 0, 2, 2),
                    embedding: self.embedding.clone(),
                });
            }
            // a stranger in every analyzed frame
            faces.push(DetectedFace {
                bounding_box: BoundingBox::new(2, 2, 4, 4),
                embedding: vec![-1.0, 0.0],
            });
            Ok(faces)
        }
    }

    /// Asks to quit on the `quit_after`-th render.
    struct StubPreview {
        quit_after: usize,
        rendered: Arc<Mutex<Vec<Vec<FaceAnnotation>>>>,
        closed: Arc<AtomicUsize>,
    }

    impl StubPreview {
        fn new(quit_after: usize) -> Self {
            Self {
                quit_after,
                rendered: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl PreviewSink for StubPreview {
        fn render(
            &mut self,
            _frame: &Frame,
            annotations: &[FaceAnnotation],
        ) -> Result<PreviewAction, Box<dyn std::error::Error>> {
            let mut rendered = self.rendered.lock().unwrap();
            rendered.push(annotations.to_vec());
            if rendered.len() >= self.quit_after {
                Ok(PreviewAction::Quit)
            } else {
                Ok(PreviewAction::Continue)
            }
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    // --- Helpers ---

    fn alice_gallery() -> Arc<Gallery> {
        let index = FlatL2Index::from_vectors(2, vec![vec![1.0, 0.0]]).unwrap();
        Arc::new(Gallery::new(Box::new(index), vec!["Alice".into()]).unwrap())
    }

    fn geometry(total_frames: usize) -> VideoGeometry {
        VideoGeometry {
            width: W,
            height: H,
            total_frames,
        }
    }

    fn config(stride: usize) -> TaggerConfig {
        TaggerConfig {
            frame_stride: stride,
            ..TaggerConfig::default()
        }
    }

    fn use_case(
        analyzer: ScriptedAnalyzer,
        preview: Option<Box<dyn PreviewSink>>,
        config: TaggerConfig,
    ) -> (TagVideoUseCase, SharedBuffer) {
        let out = SharedBuffer::default();
        let engine = RecognitionEngine::new(
            Box::new(analyzer),
            alice_gallery(),
            config.recognition_threshold,
        );
        let status = Box::new(LineStatusReporter::new(out.clone()));
        (
            TagVideoUseCase::new(engine, status, preview, config).unwrap(),
            out,
        )
    }

    fn input() -> &'static Path {
        Path::new("clip.mp4")
    }

    // --- Tests ---

    #[test]
    fn test_end_to_end_identity_in_middle_of_video() {
        let (mut uc, out) = use_case(ScriptedAnalyzer::alice_in(10..=40), None, config(5));
        let mut source = MemorySource::with_frames(150);

        let outcome = uc.execute(input(), &geometry(150), &mut source).unwrap();

        assert_eq!(outcome.identities, vec!["Alice"]);
        assert_eq!(outcome.frames_seen, 150);
        assert_eq!(outcome.frames_analyzed, 30);
        assert_eq!(outcome.stop_reason, StopReason::Exhausted);

        let lines = out.lines();
        assert_eq!(lines.first().map(String::as_str), Some("PROGRESS:0"));
        assert_eq!(lines[lines.len() - 2], "PROGRESS:100");
        assert_eq!(lines[lines.len() - 1], r#"RESULTS:["Alice"]"#);
        assert_eq!(
            lines.iter().filter(|l| l.starts_with("RESULTS:")).count(),
            1
        );
    }

    #[test]
    fn test_progress_is_monotonic_and_bounded() {
        let (mut uc, out) = use_case(ScriptedAnalyzer::alice_in(1..=0), None, config(5));
        // probe under-reported the length
        uc.execute(input(), &geometry(100), &mut MemorySource::with_frames(150))
            .unwrap();

        let values: Vec<u8> = out
            .lines()
            .iter()
            .filter_map(|l| l.strip_prefix("PROGRESS:"))
            .map(|v| v.parse().unwrap())
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|v| *v <= 100));
        assert_eq!(values.last(), Some(&100));
    }

    #[rstest]
    #[case(150, 5, 30)]
    #[case(23, 5, 4)]
    #[case(7, 1, 7)]
    #[case(3, 5, 0)]
    #[case(0, 3, 0)]
    fn test_analyzed_frame_count(
        #[case] length: usize,
        #[case] stride: usize,
        #[case] expected: usize,
    ) {
        let analyzer = ScriptedAnalyzer::alice_in(1..=0);
        let calls = analyzer.calls.clone();
        let (mut uc, _) = use_case(analyzer, None, config(stride));

        let outcome = uc
            .execute(input(), &geometry(length), &mut MemorySource::with_frames(length))
            .unwrap();

        assert_eq!(outcome.frames_analyzed, expected);
        assert_eq!(calls.load(Ordering::SeqCst), expected);
        assert_eq!(outcome.frames_seen, length);
    }

    #[test]
    fn test_unknown_total_reports_only_boundaries() {
        let (mut uc, out) = use_case(ScriptedAnalyzer::alice_in(1..=100), None, config(5));
        uc.execute(input(), &geometry(0), &mut MemorySource::with_frames(100))
            .unwrap();
        assert_eq!(
            out.lines(),
            vec!["PROGRESS:0", "PROGRESS:100", r#"RESULTS:["Alice"]"#]
        );
    }

    #[test]
    fn test_no_faces_gives_empty_results() {
        let analyzer = ScriptedAnalyzer::alice_in(1..=0);
        let (mut uc, out) = use_case(analyzer, None, config(1));
        let outcome = uc
            .execute(input(), &geometry(10), &mut MemorySource::with_frames(10))
            .unwrap();
        assert!(outcome.identities.is_empty());
        assert_eq!(out.lines().last().map(String::as_str), Some("RESULTS:[]"));
    }

    #[test]
    fn test_preview_cancellation_stops_cleanly() {
        let preview = StubPreview::new(2);
        let rendered = preview.rendered.clone();
        let preview_closed = preview.closed.clone();
        let (mut uc, out) = use_case(
            ScriptedAnalyzer::alice_in(1..=100),
            Some(Box::new(preview)),
            config(1),
        );
        let mut source = MemorySource::with_frames(100);
        let source_closed = source.closed.clone();

        let outcome = uc.execute(input(), &geometry(100), &mut source).unwrap();

        assert_eq!(outcome.stop_reason, StopReason::Cancelled);
        assert_eq!(outcome.frames_seen, 2);
        assert_eq!(outcome.identities, vec!["Alice"]);
        assert_eq!(rendered.lock().unwrap().len(), 2);
        assert!(source_closed.load(Ordering::SeqCst) >= 1);
        assert!(preview_closed.load(Ordering::SeqCst) >= 1);

        let lines = out.lines();
        assert_eq!(lines[lines.len() - 2], "PROGRESS:100");
        assert_eq!(lines[lines.len() - 1], r#"RESULTS:["Alice"]"#);
    }

    #[test]
    fn test_preview_receives_labels() {
        let preview = StubPreview::new(usize::MAX);
        let rendered = preview.rendered.clone();
        let (mut uc, _) = use_case(
            ScriptedAnalyzer::alice_in(1..=1),
            Some(Box::new(preview)),
            config(1),
        );
        uc.execute(input(), &geometry(1), &mut MemorySource::with_frames(1))
            .unwrap();

        let rendered = rendered.lock().unwrap();
        let labels: Vec<(&str, bool)> = rendered[0]
            .iter()
            .map(|a| (a.label.as_str(), a.matched))
            .collect();
        assert_eq!(labels, vec![("Alice", true), ("Unknown", false)]);
    }

    #[test]
    fn test_launch_failure_emits_no_results() {
        let preview = StubPreview::new(usize::MAX);
        let preview_closed = preview.closed.clone();
        let (mut uc, out) = use_case(
            ScriptedAnalyzer::alice_in(1..=10),
            Some(Box::new(preview)),
            config(5),
        );

        let err = uc
            .execute(input(), &geometry(10), &mut MemorySource::failing_launch())
            .unwrap_err();

        assert!(matches!(err, TaggerError::DecoderLaunch { .. }));
        assert!(!out.lines().iter().any(|l| l.starts_with("RESULTS:")));
        assert_eq!(preview_closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_analysis_failure_closes_source_without_results() {
        let mut analyzer = ScriptedAnalyzer::alice_in(1..=100);
        analyzer.fail_on = Some(10);
        let (mut uc, out) = use_case(analyzer, None, config(5));
        let mut source = MemorySource::with_frames(100);
        let closed = source.closed.clone();

        let err = uc.execute(input(), &geometry(100), &mut source).unwrap_err();

        assert!(matches!(err, TaggerError::FrameAnalysis { frame: 10, .. }));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        let lines = out.lines();
        assert!(!lines.iter().any(|l| l.starts_with("RESULTS:")));
        assert!(!lines.iter().any(|l| l == "PROGRESS:100"));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let engine = RecognitionEngine::new(
            Box::new(ScriptedAnalyzer::alice_in(1..=0)),
            alice_gallery(),
            1.0,
        );
        let result = TagVideoUseCase::new(
            engine,
            Box::new(crate::pipeline::status_reporter::NullStatusReporter),
            None,
            config(0),
        );
        assert!(matches!(result, Err(TaggerError::Config(_))));
    }
}
