/// Upper bound on a single frame delta. Keeps animation from jumping after a
/// stall such as a backgrounded window.
pub const DEFAULT_MAX_DELTA_MS: f64 = 200.0;

/// Step assumed for the very first frame, which has no predecessor.
pub const BOOTSTRAP_STEP_MS: f64 = 1000.0 / 60.0;

/// Timing passed to every frame callback, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Clamped time since the previous tick.
    pub delta: f64,
    /// Host timestamp of this tick.
    pub now: f64,
}

/// Turns raw host timestamps into clamped frame deltas.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_ms: Option<f64>,
    max_delta_ms: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_DELTA_MS)
    }

    /// Clock with a custom delta ceiling. Non-positive or non-finite values
    /// fall back to [`DEFAULT_MAX_DELTA_MS`].
    pub fn with_max_delta(max_delta_ms: f64) -> Self {
        let max_delta_ms = if max_delta_ms.is_finite() && max_delta_ms > 0.0 {
            max_delta_ms
        } else {
            DEFAULT_MAX_DELTA_MS
        };
        Self {
            last_ms: None,
            max_delta_ms,
        }
    }

    pub fn max_delta_ms(&self) -> f64 {
        self.max_delta_ms
    }

    /// Timestamp of the latest tick, if any.
    pub fn last_ms(&self) -> Option<f64> {
        self.last_ms
    }

    /// Advance to `now_ms` and return the frame timing.
    ///
    /// A timestamp earlier than the previous one yields a zero delta and does
    /// not move the clock backwards.
    pub fn advance(&mut self, now_ms: f64) -> FrameTime {
        let last = self.last_ms.unwrap_or(now_ms - BOOTSTRAP_STEP_MS);
        let raw = now_ms - last;
        let delta_ms = if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, self.max_delta_ms)
        };
        if now_ms.is_finite() {
            self.last_ms = Some(match self.last_ms {
                Some(prev) => prev.max(now_ms),
                None => now_ms,
            });
        }
        FrameTime {
            delta: delta_ms / 1000.0,
            now: now_ms / 1000.0,
        }
    }

    /// Forget the previous timestamp; the next tick bootstraps again.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
