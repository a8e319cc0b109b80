//! Marker tracking glue.
//!
//! Detection itself happens in a [`MarkerDetector`] backend. This crate owns
//! what surrounds it: loading the calibration and pattern resources, the
//! detection context lifecycle, and marker controls that write detected poses
//! into a tracked object.
//!
//! # Invariants
//! - The detection canvas exists only once the context is initialized.
//! - Marker controls can only be attached to an initialized context.
//! - A marker that is not detected on an update hides its target.

mod calibration;
mod context;
mod controls;
mod detector;
mod error;
mod pattern;
mod replay;

pub use calibration::CameraCalibration;
pub use context::{ContextConfig, ContextState, DetectionCanvas, DetectionContext, DetectionMode, OnCompleted};
pub use controls::{ChangeMatrixMode, MarkerConfig, MarkerControls, TrackedAnchor, TrackedObject};
pub use detector::{MarkerDetector, MarkerObservation, PatternId};
pub use error::TrackError;
pub use pattern::Pattern;
pub use replay::{ReplayDetector, ReplayFrame, ReplayMarker, ReplayTrack};
