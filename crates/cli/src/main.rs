use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use video_tagger_core::detection::domain::face_analyzer::FaceAnalyzer;
use video_tagger_core::detection::infrastructure::onnx_face_analyzer::OnnxFaceAnalyzer;
use video_tagger_core::gallery::infrastructure::gallery_loader::load_gallery;
use video_tagger_core::pipeline::status_reporter::LineStatusReporter;
use video_tagger_core::pipeline::tag_video_use_case::TagVideoUseCase;
use video_tagger_core::pipeline::tagger_config::TaggerConfig;
use video_tagger_core::preview::open_preview;
use video_tagger_core::recognition::recognition_engine::{ensure_gallery_fits, RecognitionEngine};
use video_tagger_core::shared::constants::{
    DEFAULT_DETECTION_CONFIDENCE, DEFAULT_FRAME_STRIDE, DEFAULT_RECOGNITION_THRESHOLD,
    DEFAULT_RESIZE_WIDTH, DETECTOR_MODEL_NAME, DETECTOR_MODEL_URL, EMBEDDER_MODEL_NAME,
    EMBEDDER_MODEL_URL, PROGRESS_INTERVAL_FRAMES,
};
use video_tagger_core::shared::model_resolver::{self, ModelSpec};
use video_tagger_core::video::domain::geometry_resolver::resolve_geometry;
use video_tagger_core::video::infrastructure::ffmpeg_pipe_source::FfmpegPipeSource;
use video_tagger_core::video::infrastructure::ffprobe_probe::FfprobeProbe;
use video_tagger_core::video::infrastructure::hwaccel::HwAccel;

/// Lists the known people who appear in a video.
///
/// Progress and the final result are written to stdout as `PROGRESS:<n>`
/// and `RESULTS:<json array>` lines; diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "video-tagger")]
struct Cli {
    /// Input video file.
    video_path: PathBuf,

    /// Gallery index file (flat L2 vector index).
    index_path: PathBuf,

    /// JSON array of identity names, one per index row.
    names_path: PathBuf,

    /// ffmpeg executable used to decode frames.
    #[arg(long)]
    ffmpeg_path: PathBuf,

    /// ffprobe executable used to read video metadata.
    #[arg(long)]
    ffprobe_path: PathBuf,

    /// Analyze every Nth frame (1 = every frame).
    #[arg(long, default_value_t = DEFAULT_FRAME_STRIDE)]
    frame_skip: usize,

    /// Decode width in pixels; 0 keeps the source size.
    #[arg(long, default_value_t = DEFAULT_RESIZE_WIDTH)]
    resize_width: u32,

    /// Show analyzed frames in a window; press q to stop early.
    #[arg(long)]
    preview: bool,

    /// Match distance below which a face counts as a known identity.
    #[arg(long, default_value_t = DEFAULT_RECOGNITION_THRESHOLD)]
    threshold: f32,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_DETECTION_CONFIDENCE)]
    confidence: f64,

    /// Decoder hardware acceleration: auto, none, videotoolbox, cuda, vaapi, d3d11va.
    /// Defaults to the platform's preferred backend.
    #[arg(long)]
    hwaccel: Option<HwAccel>,

    /// Fail if the decoder produces no frame for this many seconds.
    #[arg(long)]
    read_timeout_secs: Option<u64>,

    /// Face detector ONNX model (skips the model cache).
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face embedding ONNX model (skips the model cache).
    #[arg(long)]
    embedder_model: Option<PathBuf>,

    /// Directory of bundled models, searched after the cache.
    #[arg(long)]
    models_dir: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse(), std::io::stdout()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Runs one tagging job, writing the status protocol to `out`.
fn run<W: Write + Send + 'static>(cli: Cli, out: W) -> Result<(), Box<dyn std::error::Error>> {
    validate(&cli)?;
    let config = tagger_config(&cli);
    config.validate()?;

    let preview = if config.preview {
        Some(open_preview()?)
    } else {
        None
    };

    let gallery = Arc::new(load_gallery(&cli.index_path, &cli.names_path)?);

    let probe = FfprobeProbe::new(&cli.ffprobe_path);
    let geometry = resolve_geometry(&probe, &cli.video_path, config.resize_width)?;

    let analyzer = build_analyzer(&cli)?;
    ensure_gallery_fits(&gallery, analyzer.as_ref(), &cli.index_path)?;
    let engine = RecognitionEngine::new(analyzer, gallery, config.recognition_threshold);

    let hwaccel = cli.hwaccel.unwrap_or_else(HwAccel::preferred);
    let mut source =
        FfmpegPipeSource::new(&cli.ffmpeg_path, hwaccel).with_read_timeout(config.read_timeout);

    let status = Box::new(LineStatusReporter::new(out));
    let mut use_case = TagVideoUseCase::new(engine, status, preview, config)?;
    let outcome = use_case.execute(&cli.video_path, &geometry, &mut source)?;

    log::info!(
        "Found {} known identities in {}",
        outcome.identities.len(),
        cli.video_path.display()
    );
    Ok(())
}

fn tagger_config(cli: &Cli) -> TaggerConfig {
    TaggerConfig {
        frame_stride: cli.frame_skip,
        resize_width: cli.resize_width,
        recognition_threshold: cli.threshold,
        progress_interval: PROGRESS_INTERVAL_FRAMES,
        read_timeout: cli.read_timeout_secs.map(Duration::from_secs),
        preview: cli.preview,
    }
}

fn build_analyzer(cli: &Cli) -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> {
    let bundled = cli.models_dir.as_deref();
    let detector_path = resolve_model(ModelSpec {
        name: DETECTOR_MODEL_NAME,
        url: DETECTOR_MODEL_URL,
        override_path: cli.detector_model.as_deref(),
        bundled_dir: bundled,
    })?;
    let embedder_path = resolve_model(ModelSpec {
        name: EMBEDDER_MODEL_NAME,
        url: EMBEDDER_MODEL_URL,
        override_path: cli.embedder_model.as_deref(),
        bundled_dir: bundled,
    })?;

    Ok(Box::new(OnnxFaceAnalyzer::new(
        &detector_path,
        &embedder_path,
        cli.confidence,
    )?))
}

fn resolve_model(spec: ModelSpec<'_>) -> Result<PathBuf, model_resolver::ModelResolveError> {
    log::info!("Resolving model: {}", spec.name);
    let name = spec.name.to_string();
    let path = model_resolver::resolve(
        &spec,
        Some(Box::new(move |downloaded, total| {
            download_progress(&name, downloaded, total)
        })),
    )?;
    log::debug!("Using {}", path.display());
    Ok(path)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for (label, path) in [
        ("Input video", &cli.video_path),
        ("Index file", &cli.index_path),
        ("Names file", &cli.names_path),
    ] {
        if !path.is_file() {
            return Err(format!("{label} not found: {}", path.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    Ok(())
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
