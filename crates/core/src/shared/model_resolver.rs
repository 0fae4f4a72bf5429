use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model override {0} does not exist")]
    MissingOverride(PathBuf),
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for one ONNX model.
pub struct ModelSpec<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// Explicit path given by the user; bypasses cache and download.
    pub override_path: Option<&'a Path>,
    /// Directory of models shipped next to the binary.
    pub bundled_dir: Option<&'a Path>,
}

/// Resolve a model file, downloading it into the user cache if needed.
///
/// Resolution order: explicit override, user cache, bundled directory,
/// download.
pub fn resolve(
    spec: &ModelSpec<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, spec, progress)
}

fn resolve_in(
    cache_dir: &Path,
    spec: &ModelSpec<'_>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = spec.override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ModelResolveError::MissingOverride(path.to_path_buf()));
    }

    let cached_path = cache_dir.join(spec.name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(bundled) = spec.bundled_dir.map(|dir| dir.join(spec.name)) {
        if bundled.exists() {
            return Ok(bundled);
        }
    }

    log::info!("Downloading {} from {}", spec.name, spec.url);
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(spec.url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/VideoTagger/models/`
/// - Linux: `$XDG_CACHE_HOME/VideoTagger/models/` or `~/.cache/VideoTagger/models/`
/// - Windows: `%LOCALAPPDATA%/VideoTagger/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join("VideoTagger").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

/// Streams the body into `<dest>.part` and renames on success, so an
/// interrupted download never leaves a truncated model at `dest`.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_to(url, &temp_path, progress)
        .and_then(|()| fs::rename(&temp_path, dest).map_err(|e| write_error(dest, e)));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_to(
    url: &str,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut file = fs::File::create(temp_path).map_err(|e| write_error(temp_path, e))?;
    let mut buf = vec![0u8; 1024 * 1024];
    let mut downloaded: u64 = 0;
    loop {
        let n = response
            .read(&mut buf)
            .map_err(|e| write_error(temp_path, e))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])
            .map_err(|e| write_error(temp_path, e))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(|e| write_error(temp_path, e))
}

fn write_error(path: &Path, source: std::io::Error) -> ModelResolveError {
    ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    }
}
