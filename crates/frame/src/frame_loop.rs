use crate::{FrameCallbacks, FrameClock, FrameTime, FrameTimer};

/// Frame clock plus callback list: the whole render loop minus the host.
///
/// The host drives it by calling [`tick`](Self::tick) on every refresh. A
/// stopped loop ignores ticks until [`start`](Self::start) is called again.
pub struct FrameLoop<S> {
    clock: FrameClock,
    callbacks: FrameCallbacks<S>,
    timer: FrameTimer,
    frames: u64,
    running: bool,
}

impl<S> Default for FrameLoop<S> {
    fn default() -> Self {
        Self::new(FrameClock::new())
    }
}

impl<S> FrameLoop<S> {
    pub fn new(clock: FrameClock) -> Self {
        Self {
            clock,
            callbacks: FrameCallbacks::new(),
            timer: FrameTimer::new(120),
            frames: 0,
            running: true,
        }
    }

    pub fn callbacks(&self) -> &FrameCallbacks<S> {
        &self.callbacks
    }

    /// Register a callback. See [`FrameCallbacks::push`].
    pub fn on_frame(&mut self, label: impl Into<String>, callback: impl FnMut(&mut S, FrameTime) + 'static) {
        self.callbacks.push(label, callback);
    }

    /// Run one frame at host time `now_ms`. Returns `None` when stopped.
    pub fn tick(&mut self, state: &mut S, now_ms: f64) -> Option<FrameTime> {
        if !self.running {
            return None;
        }
        let time = self.clock.advance(now_ms);
        self.frames += 1;
        self.timer.record(time.delta);
        self.callbacks.run(state, time);
        Some(time)
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn stats(&self) -> &FrameTimer {
        &self.timer
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resume ticking. The first tick after a restart bootstraps the clock.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.clock.reset();
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(frames = self.frames, "frame loop stopped");
        }
        self.running = false;
    }
}

impl<S> std::fmt::Debug for FrameLoop<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("clock", &self.clock)
            .field("callbacks", &self.callbacks)
            .field("frames", &self.frames)
            .field("running", &self.running)
            .finish()
    }
}
