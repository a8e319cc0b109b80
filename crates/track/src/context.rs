use glam::Mat4;
use markerview_common::{ElementSize, ResourceBase, SizedElement, VideoFrame};
use serde::{Deserialize, Serialize};

use crate::{CameraCalibration, MarkerConfig, MarkerControls, MarkerDetector, Pattern, TrackError, TrackedObject};

/// Which image features the detector matches against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    #[default]
    Mono,
    Color,
    MonoAndMatrix,
    ColorAndMatrix,
}

fn default_camera_parameters_url() -> String {
    "data/camera_para.dat".to_owned()
}

fn default_canvas_size() -> ElementSize {
    ElementSize::new(640, 480)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    #[serde(default = "default_camera_parameters_url")]
    pub camera_parameters_url: String,
    pub detection_mode: DetectionMode,
    #[serde(default = "default_canvas_size")]
    pub canvas_size: ElementSize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            camera_parameters_url: default_camera_parameters_url(),
            detection_mode: DetectionMode::default(),
            canvas_size: default_canvas_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Uninitialized,
    Initialized,
}

/// The offscreen canvas frames are copied into for detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionCanvas {
    size: ElementSize,
}

impl DetectionCanvas {
    pub fn new(size: ElementSize) -> Self {
        Self { size }
    }
}

impl SizedElement for DetectionCanvas {
    fn element_size(&self) -> ElementSize {
        self.size
    }

    fn set_element_size(&mut self, size: ElementSize) {
        self.size = size;
    }
}

/// Completion for [`DetectionContext::init`], carrying the projection matrix.
pub type OnCompleted = Box<dyn FnOnce(Result<Mat4, TrackError>) + Send>;

/// Owns the detector backend and the controls attached to it.
pub struct DetectionContext {
    config: ContextConfig,
    detector: Box<dyn MarkerDetector>,
    state: ContextState,
    projection: Mat4,
    canvas: Option<DetectionCanvas>,
    controls: Vec<MarkerControls>,
}

impl DetectionContext {
    pub fn new(config: ContextConfig, detector: Box<dyn MarkerDetector>) -> Self {
        Self {
            config,
            detector,
            state: ContextState::Uninitialized,
            projection: Mat4::IDENTITY,
            canvas: None,
            controls: Vec::new(),
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == ContextState::Initialized
    }

    /// Projection matrix from the calibration. Identity until initialized.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Load the calibration and prepare the detector. The outcome is
    /// reported through `on_completed`, never returned.
    pub fn init(&mut self, base: &ResourceBase, on_completed: OnCompleted) {
        if self.is_initialized() {
            on_completed(Err(TrackError::AlreadyInitialized));
            return;
        }
        let result = self.load(base);
        if let Ok(projection) = &result {
            self.projection = *projection;
            self.canvas = Some(DetectionCanvas::new(self.config.canvas_size));
            self.state = ContextState::Initialized;
            tracing::info!(
                detector = self.detector.name(),
                mode = ?self.config.detection_mode,
                "detection context initialized"
            );
        }
        on_completed(result);
    }

    fn load(&mut self, base: &ResourceBase) -> Result<Mat4, TrackError> {
        let bytes = base.read(&self.config.camera_parameters_url)?;
        let calibration = CameraCalibration::parse(&bytes)?;
        tracing::debug!(size = %calibration.size, "camera parameters loaded");
        self.detector.init(&calibration, self.config.detection_mode)
    }

    /// The detection canvas, present only once initialized.
    pub fn controller_canvas_mut(&mut self) -> Option<&mut DetectionCanvas> {
        self.canvas.as_mut()
    }

    pub fn controller_canvas(&self) -> Option<&DetectionCanvas> {
        self.canvas.as_ref()
    }

    /// Load a pattern and attach marker controls for it.
    pub fn attach(&mut self, config: MarkerConfig, base: &ResourceBase) -> Result<&MarkerControls, TrackError> {
        if !self.is_initialized() {
            return Err(TrackError::NotInitialized);
        }
        let text = base.read_to_string(&config.pattern_url)?;
        let pattern = Pattern::parse(&text)?;
        let id = self.detector.load_pattern(&pattern)?;
        tracing::info!(pattern = %config.pattern_url, ?id, mode = ?config.change_matrix_mode, "marker controls attached");
        self.controls.push(MarkerControls::new(id, config));
        Ok(&self.controls[self.controls.len() - 1])
    }

    pub fn controls(&self) -> &[MarkerControls] {
        &self.controls
    }

    /// Run detection on `frame` and apply every attached control to
    /// `target`, in attach order. Returns how many markers were detected.
    pub fn update(&mut self, frame: &VideoFrame, target: &mut dyn TrackedObject) -> usize {
        if !self.is_initialized() {
            return 0;
        }
        let observations = self.detector.detect(frame);
        let mut detected = 0;
        for controls in &self.controls {
            if controls.apply(&observations, &mut *target) {
                detected += 1;
            }
        }
        tracing::trace!(frame = frame.index, observations = observations.len(), detected, "detection update");
        detected
    }
}

impl std::fmt::Debug for DetectionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionContext")
            .field("detector", &self.detector.name())
            .field("state", &self.state)
            .field("canvas", &self.canvas)
            .field("controls", &self.controls.len())
            .finish()
    }
}
