pub const DETECTOR_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDER_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDER_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Nearest-neighbor distances below this resolve to a known identity.
pub const DEFAULT_RECOGNITION_THRESHOLD: f32 = 1.0;

/// Analyze 1 in N decoded frames.
pub const DEFAULT_FRAME_STRIDE: usize = 5;

/// Target decode width; 0 keeps the source width.
pub const DEFAULT_RESIZE_WIDTH: u32 = 640;

/// Emit a progress line every N consumed frames.
pub const PROGRESS_INTERVAL_FRAMES: usize = 15;

pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

pub const UNKNOWN_IDENTITY: &str = "Unknown";

pub const PREVIEW_WINDOW_TITLE: &str = "Media Tagger - Preview";

/// Packed RGB24.
pub const BYTES_PER_PIXEL: usize = 3;
