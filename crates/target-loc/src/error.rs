use std::path::PathBuf;

use target_loc_tags::DictionaryError;

/// Failure to open or read the capture device.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("cannot read frame directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame directory {0} contains no PNG or JPEG images")]
    NoFrames(PathBuf),
    #[error("cannot decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("camera device: {0}")]
    Device(String),
    #[error("{0}")]
    Unsupported(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Startup failures; the loop itself never returns an error.
#[derive(thiserror::Error, Debug)]
pub enum LocatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("tag codebook: {0}")]
    Dictionary(#[from] DictionaryError),
    #[error("capture: {0}")]
    Capture(#[from] CaptureError),
    #[error("cannot start command reader: {0}")]
    Commands(#[source] std::io::Error),
}
