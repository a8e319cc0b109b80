//! Runtime glue for the marker overlay.
//!
//! Wires a video source, a detection context, and a renderer into one
//! [`Session`] driven by the host's refresh ticks.
//!
//! # Invariants
//! - Everything runs on the host thread. Backends that complete elsewhere
//!   report through a [`Notifier`], drained at the start of each frame.
//! - Marker controls are attached only after the context reports
//!   initialization.
//! - Frame callbacks run in the order detect, spin, render.
//! - A session cancels its pending timers when torn down or dropped.

mod backend;
mod config;
mod error;
mod events;
mod resize;
mod sequencer;
mod session;

pub use backend::open_detector;
pub use config::{AppConfig, ConfigError};
pub use error::RuntimeError;
pub use events::{EventPump, InitEvent, InitStage, Notifier, channel};
pub use resize::{ResizeOutcome, on_resize};
pub use sequencer::{InitAction, InitSequencer, MarkerState};
pub use session::{Session, SessionState};
