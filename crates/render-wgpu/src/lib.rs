//! wgpu render backend for the marker overlay.
//!
//! Draws the current video frame as a full-surface background, then the scene
//! meshes with a normal-direction material on top.
//!
//! # Invariants
//! - The renderer owns its surface; resizing reconfigures it in place.
//! - Meshes are tessellated once per node, on first draw.
//! - Opaque meshes are drawn before transparent ones.

mod gpu;
mod mesh;
mod shaders;

pub use gpu::{FrameOverlay, OverlayContext, WgpuRenderer};
pub use mesh::{MeshData, Vertex, tessellate};
