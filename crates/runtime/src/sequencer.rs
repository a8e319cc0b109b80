use glam::Mat4;
use markerview_capture::SourceState;
use markerview_track::ContextState;

use crate::{InitEvent, InitStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    Detached,
    Attached,
}

/// Follow-up work the session performs for an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitAction {
    /// Schedule the one-time deferred resize.
    ScheduleResize,
    /// Copy the context's projection into the scene camera.
    ApplyProjection(Mat4),
    /// Load the marker pattern and attach controls.
    AttachMarkers,
}

/// Tracks the three initialization steps and turns completions into actions.
#[derive(Debug)]
pub struct InitSequencer {
    source: SourceState,
    context: ContextState,
    markers: MarkerState,
    failure: Option<(InitStage, String)>,
}

impl Default for InitSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl InitSequencer {
    pub fn new() -> Self {
        Self {
            source: SourceState::NotReady,
            context: ContextState::Uninitialized,
            markers: MarkerState::Detached,
            failure: None,
        }
    }

    pub fn handle(&mut self, event: InitEvent) -> Vec<InitAction> {
        match event {
            InitEvent::SourceReady(size) => {
                if self.source == SourceState::Ready {
                    tracing::warn!("source reported ready twice");
                    return Vec::new();
                }
                self.source = SourceState::Ready;
                tracing::info!(%size, "video source ready");
                vec![InitAction::ScheduleResize]
            }
            InitEvent::ContextInitialized(projection) => {
                if self.context == ContextState::Initialized {
                    tracing::warn!("context reported initialized twice");
                    return Vec::new();
                }
                self.context = ContextState::Initialized;
                vec![InitAction::ApplyProjection(projection), InitAction::AttachMarkers]
            }
            InitEvent::Failed { stage, error } => {
                tracing::error!(%stage, %error, "initialization failed");
                self.fail(stage, error.to_string());
                Vec::new()
            }
        }
    }

    pub fn markers_attached(&mut self) {
        self.markers = MarkerState::Attached;
    }

    /// Record a failure. Only the first is kept.
    pub fn fail(&mut self, stage: InitStage, message: String) {
        self.failure.get_or_insert((stage, message));
    }

    pub fn source(&self) -> SourceState {
        self.source
    }

    pub fn context(&self) -> ContextState {
        self.context
    }

    pub fn markers(&self) -> MarkerState {
        self.markers
    }

    pub fn failure(&self) -> Option<(InitStage, &str)> {
        self.failure.as_ref().map(|(stage, msg)| (*stage, msg.as_str()))
    }

    /// All three steps done.
    pub fn is_complete(&self) -> bool {
        self.source == SourceState::Ready
            && self.context == ContextState::Initialized
            && self.markers == MarkerState::Attached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerview_common::ElementSize;
    use markerview_track::TrackError;

    #[test]
    fn source_ready_schedules_resize_once() {
        let mut seq = InitSequencer::new();
        assert_eq!(
            seq.handle(InitEvent::SourceReady(ElementSize::new(640, 480))),
            vec![InitAction::ScheduleResize]
        );
        assert_eq!(seq.source(), SourceState::Ready);
        assert!(seq.handle(InitEvent::SourceReady(ElementSize::new(640, 480))).is_empty());
    }

    #[test]
    fn context_ready_applies_projection_then_attaches() {
        let mut seq = InitSequencer::new();
        let p = Mat4::from_scale(glam::Vec3::splat(2.0));
        assert_eq!(
            seq.handle(InitEvent::ContextInitialized(p)),
            vec![InitAction::ApplyProjection(p), InitAction::AttachMarkers]
        );
        assert_eq!(seq.context(), ContextState::Initialized);
        assert_eq!(seq.markers(), MarkerState::Detached);
    }

    #[test]
    fn complete_after_all_steps() {
        let mut seq = InitSequencer::new();
        seq.handle(InitEvent::ContextInitialized(Mat4::IDENTITY));
        seq.markers_attached();
        assert!(!seq.is_complete());
        seq.handle(InitEvent::SourceReady(ElementSize::new(1, 1)));
        assert!(seq.is_complete());
    }

    #[test]
    fn failure_is_recorded_without_actions() {
        let mut seq = InitSequencer::new();
        let actions = seq.handle(InitEvent::Failed {
            stage: InitStage::Context,
            error: TrackError::NotInitialized.into(),
        });
        assert!(actions.is_empty());
        assert_eq!(seq.context(), ContextState::Uninitialized);
        assert_eq!(seq.failure().map(|(s, _)| s), Some(InitStage::Context));
    }
}
