use std::time::Duration;

use markerview_capture::{VideoSource, open_source};
use markerview_common::{ElementSize, ResourceBase, SizedElement};
use markerview_frame::{FrameLoop, FrameTime, TimerHandle, TimerQueue};
use markerview_render::Renderer;
use markerview_scene::MarkerScene;
use markerview_track::{DetectionContext, MarkerConfig, MarkerDetector};

use crate::{
    AppConfig, EventPump, InitAction, InitSequencer, InitStage, Notifier, ResizeOutcome, RuntimeError, channel,
    on_resize, open_detector,
};

/// Everything the frame callbacks touch.
pub struct SessionState<R> {
    pub demo: MarkerScene,
    pub source: Box<dyn VideoSource>,
    pub context: DetectionContext,
    pub renderer: R,
    /// Markers detected on the latest update.
    pub detected: usize,
    pub render_failures: u64,
}

impl<R: Renderer> SessionState<R> {
    fn detect(&mut self) {
        // The only advance per tick; render draws the frame detected here.
        self.source.poll();
        if !self.source.is_ready() {
            return;
        }
        let Some(frame) = self.source.current_frame() else {
            return;
        };
        self.detected = self.context.update(frame, &mut self.demo.scene.camera);
        self.demo.scene.sync_visibility();
    }

    fn spin(&mut self, time: FrameTime) {
        self.demo.spin(time.delta);
    }

    fn render(&mut self) {
        let background = self.source.current_frame();
        if let Err(error) = self.renderer.render(&self.demo.scene, background) {
            self.render_failures += 1;
            tracing::error!(%error, renderer = self.renderer.name(), "render failed");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Resize,
}

/// The marker overlay: source, detection context, scene and renderer driven
/// by host refresh ticks.
///
/// The host calls [`frame`](Self::frame) on every refresh and
/// [`resize`](Self::resize) on every viewport change.
pub struct Session<R: Renderer + 'static> {
    state: SessionState<R>,
    frame_loop: FrameLoop<SessionState<R>>,
    timers: TimerQueue<Deferred>,
    resize_timer: Option<TimerHandle>,
    sequencer: InitSequencer,
    notifier: Notifier,
    pump: EventPump,
    base: ResourceBase,
    marker: MarkerConfig,
    resize_delay: Duration,
    viewport: ElementSize,
    now_ms: f64,
    started: bool,
    torn_down: bool,
}

impl<R: Renderer + 'static> Session<R> {
    /// Build a session with the source and detector the configuration names.
    pub fn from_config(config: &AppConfig, renderer: R) -> Result<Self, RuntimeError> {
        let base = config.resource_base();
        let source = open_source(&config.source, &base)?;
        let detector = open_detector(config.track_url.as_deref(), &base)?;
        Ok(Self::new(config, source, detector, renderer))
    }

    pub fn new(
        config: &AppConfig,
        source: Box<dyn VideoSource>,
        detector: Box<dyn MarkerDetector>,
        renderer: R,
    ) -> Self {
        let viewport = renderer.element_size();
        let context = DetectionContext::new(config.context_config(), detector);

        let mut frame_loop = FrameLoop::new(config.frame_clock());
        frame_loop.on_frame("detect", |s: &mut SessionState<R>, _| s.detect());
        frame_loop.on_frame("spin", |s: &mut SessionState<R>, time| s.spin(time));
        frame_loop.on_frame("render", |s: &mut SessionState<R>, _| s.render());

        let (notifier, pump) = channel();
        Self {
            state: SessionState {
                demo: MarkerScene::build(),
                source,
                context,
                renderer,
                detected: 0,
                render_failures: 0,
            },
            frame_loop,
            timers: TimerQueue::new(),
            resize_timer: None,
            sequencer: InitSequencer::new(),
            notifier,
            pump,
            base: config.resource_base(),
            marker: config.marker.clone(),
            resize_delay: config.resize_delay(),
            viewport,
            now_ms: 0.0,
            started: false,
            torn_down: false,
        }
    }

    /// Kick off source acquisition and context initialization. Completions
    /// are handled on later [`frame`](Self::frame) calls.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        tracing::info!(
            source = self.state.source.kind(),
            detector = self.state.context.detector_name(),
            renderer = self.state.renderer.name(),
            "session starting"
        );
        self.state.source.init(self.notifier.source_callback())?;
        self.state
            .context
            .init(&self.base, self.notifier.context_callback());
        Ok(())
    }

    /// Run one refresh at host time `now_ms`: drain init completions, fire
    /// due timers, then run the frame callbacks.
    pub fn frame(&mut self, now_ms: f64) -> Option<FrameTime> {
        if self.torn_down {
            return None;
        }
        if now_ms.is_finite() {
            self.now_ms = self.now_ms.max(now_ms);
        }
        self.pump_events();

        for deferred in self.timers.take_due(self.now_ms) {
            match deferred {
                Deferred::Resize => {
                    self.resize_timer = None;
                    tracing::debug!("deferred resize fired");
                    self.resize(self.viewport);
                }
            }
        }

        self.frame_loop.tick(&mut self.state, now_ms)
    }

    /// Handle every pending init completion.
    pub fn pump_events(&mut self) {
        for event in self.pump.drain() {
            for action in self.sequencer.handle(event) {
                self.apply(action);
            }
        }
    }

    fn apply(&mut self, action: InitAction) {
        match action {
            InitAction::ScheduleResize => {
                // Emitted once per session; the sequencer ignores a repeated ready.
                let handle = self.timers.schedule(self.now_ms, self.resize_delay, Deferred::Resize);
                self.resize_timer = Some(handle);
            }
            InitAction::ApplyProjection(projection) => {
                self.state.demo.scene.camera.projection = projection;
            }
            InitAction::AttachMarkers => match self.state.context.attach(self.marker.clone(), &self.base) {
                Ok(_) => self.sequencer.markers_attached(),
                Err(error) => {
                    tracing::error!(%error, pattern = %self.marker.pattern_url, "marker controls not attached");
                    self.sequencer.fail(InitStage::Context, error.to_string());
                }
            },
        }
    }

    /// Viewport changed: re-lay the source and propagate its size.
    pub fn resize(&mut self, viewport: ElementSize) -> ResizeOutcome {
        self.viewport = viewport;
        let state = &mut self.state;
        on_resize(
            state.source.as_mut(),
            viewport,
            &mut state.renderer,
            &mut state.context,
        )
    }

    /// Cancel pending timers and stop the frame loop. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Some(handle) = self.resize_timer.take() {
            self.timers.cancel(handle);
        }
        self.timers.clear();
        self.frame_loop.stop();
        tracing::info!(frames = self.frame_loop.frame_count(), "session torn down");
    }

    pub fn state(&self) -> &SessionState<R> {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.state.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.state.renderer
    }

    pub fn sequencer(&self) -> &InitSequencer {
        &self.sequencer
    }

    pub fn frame_loop(&self) -> &FrameLoop<SessionState<R>> {
        &self.frame_loop
    }

    /// A second handle for backends that complete on their own.
    pub fn notifier(&self) -> Notifier {
        self.notifier.clone()
    }

    pub fn viewport(&self) -> ElementSize {
        self.viewport
    }

    pub fn is_resize_pending(&self) -> bool {
        self.resize_timer
            .is_some_and(|handle| self.timers.is_pending(handle))
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<R: Renderer + 'static> Drop for Session<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markerview_capture::SyntheticSource;
    use markerview_common::ElementLayout;
    use markerview_render::DebugTextRenderer;
    use markerview_track::{CameraCalibration, ContextState, ReplayDetector, ReplayTrack};
    use std::f64::consts::PI;
    use std::path::Path;

    use crate::{InitEvent, MarkerState};

    fn write_resources(dir: &Path) {
        std::fs::create_dir_all(dir.join("data")).unwrap();
        std::fs::write(
            dir.join("data/camera_para.dat"),
            CameraCalibration::nominal_640x480().to_bytes(),
        )
        .unwrap();
        let plane = vec!["200"; 16 * 16].join(" ");
        std::fs::write(dir.join("data/patt.hiro"), vec![plane; 12].join("\n")).unwrap();
    }

    fn session(dir: &Path, source_size: ElementSize, track: ReplayTrack) -> Session<DebugTextRenderer> {
        let config = AppConfig {
            base_path: dir.to_path_buf(),
            ..AppConfig::default()
        };
        Session::new(
            &config,
            Box::new(SyntheticSource::new(source_size)),
            Box::new(ReplayDetector::new(track)),
            DebugTextRenderer::new(config.renderer.clone()),
        )
    }

    #[test]
    fn callbacks_registered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        let labels: Vec<_> = s.frame_loop().callbacks().labels().collect();
        assert_eq!(labels, vec!["detect", "spin", "render"]);
    }

    #[test]
    fn resize_with_uninitialized_context_updates_surface_only() {
        // No calibration file: the context never initializes.
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        assert_eq!(s.sequencer().context(), ContextState::Uninitialized);
        assert!(s.sequencer().failure().is_some());

        let outcome = s.resize(ElementSize::new(1000, 500));
        assert!(outcome.surface);
        assert!(!outcome.canvas);
        assert_eq!(
            outcome.layout,
            ElementLayout {
                size: ElementSize::new(1000, 750),
                margin_left: 0,
                margin_top: -125,
            }
        );
        assert_eq!(s.renderer().element_size(), ElementSize::new(1000, 750));
        assert!(s.state().context.controller_canvas().is_none());
    }

    #[test]
    fn resize_with_initialized_context_updates_surface_and_canvas() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        assert!(s.sequencer().is_complete());

        let outcome = s.resize(ElementSize::new(1000, 500));
        assert!(outcome.surface && outcome.canvas);
        assert_eq!(s.renderer().element_size(), ElementSize::new(1000, 750));
        assert_eq!(
            s.state().context.controller_canvas().map(|c| c.element_size()),
            Some(ElementSize::new(1000, 750))
        );
    }

    #[test]
    fn projection_copied_into_camera() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        assert_eq!(
            s.state().demo.scene.camera.projection,
            s.state().context.projection_matrix()
        );
        assert_eq!(s.sequencer().markers(), MarkerState::Attached);
    }

    #[test]
    fn deferred_resize_fires_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        assert!(s.is_resize_pending());

        s.resize(ElementSize::new(1000, 500));
        s.renderer_mut().set_element_size(ElementSize::new(1, 1));

        s.frame(1999.0);
        assert!(s.is_resize_pending());
        assert_eq!(s.renderer().element_size(), ElementSize::new(1, 1));

        s.frame(2000.0);
        assert!(!s.is_resize_pending());
        assert_eq!(s.renderer().element_size(), ElementSize::new(1000, 750));
    }

    #[test]
    fn repeated_source_ready_keeps_single_resize_timer() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        let first = s.resize_timer;
        assert!(first.is_some());

        s.notifier().send(InitEvent::SourceReady(ElementSize::new(640, 480)));
        s.frame(1000.0);
        assert_eq!(s.resize_timer, first);
        assert_eq!(s.timers.len(), 1);

        // Still due two seconds after the first ready, not the second.
        s.frame(2000.0);
        assert!(!s.is_resize_pending());
        assert!(s.timers.is_empty());
    }

    #[test]
    fn background_frame_advances_once_per_tick() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::orbit(3, 0));
        s.start().unwrap();
        for now in [0.0, 16.0, 32.0] {
            s.frame(now);
        }
        assert_eq!(s.renderer().frames(), 3);
        assert!(s.renderer().output().contains("background: #3 640x480"));
    }

    #[test]
    fn teardown_cancels_pending_resize() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::default());
        s.start().unwrap();
        s.frame(0.0);
        assert!(s.is_resize_pending());

        s.teardown();
        assert!(!s.is_resize_pending());
        assert!(s.frame(5000.0).is_none());
        assert_eq!(s.renderer().frames(), 1);
        s.teardown();
    }

    #[test]
    fn detection_skipped_until_source_ready() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        // An empty synthetic source fails to initialize and never becomes ready.
        let mut s = session(dir.path(), ElementSize::new(0, 0), ReplayTrack::orbit(4, 0));
        s.start().unwrap();
        for now in [0.0, 16.0, 32.0] {
            s.frame(now);
        }
        assert!(!s.state().demo.scene.visible);
        assert_eq!(s.state().detected, 0);
        assert_eq!(s.renderer().frames(), 3);
        assert_eq!(s.renderer().frames_with_scene(), 0);
        assert!(!s.is_resize_pending());
    }

    #[test]
    fn end_to_end_visibility_and_spin() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::orbit(3, 2));
        s.start().unwrap();

        let mut visible = Vec::new();
        for i in 0..6 {
            s.frame(i as f64 * 16.0);
            visible.push(s.state().demo.scene.visible);
        }
        assert_eq!(visible, vec![true, true, true, false, false, true]);
        assert_eq!(s.renderer().frames(), 6);
        assert_eq!(s.renderer().frames_with_scene(), 4);

        let demo = &s.state().demo;
        let cube = demo.scene.get(demo.cube).unwrap();
        let expected = PI * (1.0 / 60.0 + 5.0 * 0.016);
        assert!((cube.transform.rotation.x as f64 - expected).abs() < 1e-4);
        let knot = demo.scene.get(demo.knot).unwrap();
        assert_eq!(knot.transform.rotation.x, 0.0);
    }

    #[test]
    fn missing_pattern_leaves_markers_detached() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        std::fs::remove_file(dir.path().join("data/patt.hiro")).unwrap();
        let mut s = session(dir.path(), ElementSize::new(640, 480), ReplayTrack::orbit(2, 0));
        s.start().unwrap();
        s.frame(0.0);
        assert_eq!(s.sequencer().context(), ContextState::Initialized);
        assert_eq!(s.sequencer().markers(), MarkerState::Detached);
        // Nothing attached, so nothing detected: the camera is hidden.
        assert!(!s.state().demo.scene.visible);
    }

    #[test]
    fn from_config_with_synthetic_source() {
        let dir = tempfile::tempdir().unwrap();
        write_resources(dir.path());
        let yaml = format!(
            "base_path: {}\nsource:\n  kind: synthetic\n  width: 320\n  height: 240\n",
            dir.path().display()
        );
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        let renderer = DebugTextRenderer::new(config.renderer.clone());
        let mut s = Session::from_config(&config, renderer).unwrap();
        s.start().unwrap();
        s.frame(0.0);
        assert!(s.sequencer().is_complete());
        assert!(s.renderer().output().contains("background: #"));
    }
}
