use markerview_capture::CaptureError;
use markerview_common::ResourceError;
use markerview_render::RenderError;
use markerview_track::TrackError;
use thiserror::Error;

use crate::ConfigError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Render(#[from] RenderError),
}
