use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render surface unavailable: {0}")]
    Surface(String),
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("render backend error: {0}")]
    Backend(String),
}
