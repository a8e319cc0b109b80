use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no frames in {0}")]
    NoFrames(PathBuf),
    #[error("capture device error: {0}")]
    Device(String),
    #[error("unsupported source: {0}")]
    Unsupported(String),
    #[error("source already initialized")]
    AlreadyInitialized,
}
