//! Rendering adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - A renderer reads the scene; it never mutates it.
//! - While the scene root is hidden only the background is drawn.
//! - The render surface is created once and afterwards only resized.
//!
//! The [`DebugTextRenderer`] stands in for a GPU backend in headless runs and
//! tests. The wgpu backend lives in `markerview-render-wgpu`.

mod config;
mod error;
mod renderer;
mod viewport;

pub use config::RendererConfig;
pub use error::RenderError;
pub use renderer::{DebugTextRenderer, Renderer};
pub use viewport::{crop_transform, visible_rect};
