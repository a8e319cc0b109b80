use glam::Mat4;
use markerview_common::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::{CameraCalibration, DetectionMode, Pattern, TrackError};

/// Identifier a detector assigns to a loaded pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub u32);

/// One marker found in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerObservation {
    pub pattern: PatternId,
    /// Marker-to-camera transform (model-view matrix of the marker).
    pub pose: Mat4,
    /// Match confidence in `0.0..=1.0`.
    pub confidence: f32,
}

/// A marker detection backend.
///
/// Implementations own detection and pose estimation; the rest of the
/// workspace only sees observations.
pub trait MarkerDetector {
    fn name(&self) -> &'static str;

    /// Prepare for detection and return the projection matrix derived from
    /// the calibration.
    fn init(&mut self, calibration: &CameraCalibration, mode: DetectionMode) -> Result<Mat4, TrackError>;

    /// Register a pattern to look for.
    fn load_pattern(&mut self, pattern: &Pattern) -> Result<PatternId, TrackError>;

    /// Find markers in a frame.
    fn detect(&mut self, frame: &VideoFrame) -> Vec<MarkerObservation>;
}
