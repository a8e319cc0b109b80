//! Scene graph for the marker overlay.
//!
//! # Invariants
//! - Nodes are created once at startup and never removed.
//! - Node order is insertion order; renderers draw in that order.
//! - Root visibility follows the marker-visibility flag of the camera.

mod camera;
mod demo;
mod graph;
mod mesh;

pub use camera::SceneCamera;
pub use demo::MarkerScene;
pub use graph::Scene;
pub use mesh::{Geometry, MeshNode, NormalMaterial, Side};
