//! Shared types for the markerview workspace.
//!
//! # Invariants
//! - Element sizes are in physical pixels and never zero once laid out.
//! - Resources are always resolved relative to one base path.

mod frame;
mod resource;
mod types;

pub use frame::VideoFrame;
pub use resource::{ResourceBase, ResourceError};
pub use types::{ElementLayout, ElementSize, NodeId, SizedElement, Transform};
