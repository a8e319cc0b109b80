use markerview_common::ResourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("malformed camera parameters: {0}")]
    Calibration(String),
    #[error("malformed marker pattern: {0}")]
    Pattern(String),
    #[error("malformed replay track: {0}")]
    Track(#[from] serde_json::Error),
    #[error("detector error: {0}")]
    Detector(String),
    #[error("detection context is not initialized")]
    NotInitialized,
    #[error("detection context already initialized")]
    AlreadyInitialized,
}
