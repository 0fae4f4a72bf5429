use std::fmt;
use std::str::FromStr;

/// Decoder hardware acceleration, chosen once at startup and handed to the
/// frame source as configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwAccel {
    /// Let the decoder pick an available backend, falling back to software.
    Auto,
    None,
    VideoToolbox,
    Cuda,
    Vaapi,
    D3d11va,
}

impl HwAccel {
    /// The preferred backend for the current platform.
    pub fn preferred() -> Self {
        #[cfg(target_os = "macos")]
        {
            HwAccel::VideoToolbox
        }
        #[cfg(not(target_os = "macos"))]
        {
            HwAccel::Auto
        }
    }

    /// Decoder arguments placed before `-i`.
    pub fn decoder_args(self) -> &'static [&'static str] {
        match self {
            HwAccel::Auto => &["-hwaccel", "auto"],
            HwAccel::None => &[],
            HwAccel::VideoToolbox => &["-hwaccel", "videotoolbox"],
            HwAccel::Cuda => &["-hwaccel", "cuda"],
            HwAccel::Vaapi => &["-hwaccel", "vaapi"],
            HwAccel::D3d11va => &["-hwaccel", "d3d11va"],
        }
    }
}

impl fmt::Display for HwAccel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HwAccel::Auto => "auto",
            HwAccel::None => "none",
            HwAccel::VideoToolbox => "videotoolbox",
            HwAccel::Cuda => "cuda",
            HwAccel::Vaapi => "vaapi",
            HwAccel::D3d11va => "d3d11va",
        };
        f.write_str(name)
    }
}

impl FromStr for HwAccel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(HwAccel::Auto),
            "none" | "off" => Ok(HwAccel::None),
            "videotoolbox" => Ok(HwAccel::VideoToolbox),
            "cuda" => Ok(HwAccel::Cuda),
            "vaapi" => Ok(HwAccel::Vaapi),
            "d3d11va" => Ok(HwAccel::D3d11va),
            other => Err(format!(
                "unknown hwaccel '{other}', expected one of: auto, none, videotoolbox, cuda, vaapi, d3d11va"
            )),
        }
    }
}
