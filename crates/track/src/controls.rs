use glam::Mat4;
use markerview_scene::SceneCamera;
use serde::{Deserialize, Serialize};

use crate::{MarkerObservation, PatternId};

/// How a detected pose is written into the tracked object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeMatrixMode {
    /// The tracked object moves onto the marker; the camera stays put.
    ModelViewMatrix,
    /// The camera moves around a marker fixed at the origin.
    #[default]
    CameraTransformMatrix,
}

fn default_pattern_url() -> String {
    "data/patt.hiro".to_owned()
}

fn default_min_confidence() -> f32 {
    0.6
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    #[serde(default = "default_pattern_url")]
    pub pattern_url: String,
    pub change_matrix_mode: ChangeMatrixMode,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            pattern_url: default_pattern_url(),
            change_matrix_mode: ChangeMatrixMode::default(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Something whose pose and visibility marker tracking drives.
pub trait TrackedObject {
    fn matrix(&self) -> Mat4;
    fn set_matrix(&mut self, matrix: Mat4);
    fn visible(&self) -> bool;
    fn set_visible(&mut self, visible: bool);
}

impl TrackedObject for SceneCamera {
    fn matrix(&self) -> Mat4 {
        self.matrix
    }

    fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// A bare tracked transform, for model-view tracking of a scene group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedAnchor {
    pub matrix: Mat4,
    pub visible: bool,
}

impl Default for TrackedAnchor {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            visible: false,
        }
    }
}

impl TrackedObject for TrackedAnchor {
    fn matrix(&self) -> Mat4 {
        self.matrix
    }

    fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Binds one loaded pattern to a tracked object.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerControls {
    pattern: PatternId,
    config: MarkerConfig,
}

impl MarkerControls {
    pub fn new(pattern: PatternId, config: MarkerConfig) -> Self {
        Self { pattern, config }
    }

    pub fn pattern(&self) -> PatternId {
        self.pattern
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    /// Update `target` from this frame's observations. Returns whether the
    /// marker was detected.
    pub fn apply(&self, observations: &[MarkerObservation], target: &mut dyn TrackedObject) -> bool {
        let best = observations
            .iter()
            .filter(|o| o.pattern == self.pattern && o.confidence >= self.config.min_confidence)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

        let Some(obs) = best else {
            target.set_visible(false);
            return false;
        };

        let matrix = match self.config.change_matrix_mode {
            ChangeMatrixMode::ModelViewMatrix => obs.pose,
            ChangeMatrixMode::CameraTransformMatrix => obs.pose.inverse(),
        };
        target.set_matrix(matrix);
        target.set_visible(true);
        true
    }
}
