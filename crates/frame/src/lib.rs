//! Render-loop scheduling.
//!
//! A host (winit redraw, `requestAnimationFrame`, a headless simulator) calls
//! [`FrameLoop::tick`] once per display refresh with a monotonic timestamp in
//! milliseconds. The loop computes a clamped delta and runs every registered
//! callback in registration order.
//!
//! # Invariants
//! - Delta is always within `[0, max_delta]`.
//! - The first tick reports one nominal 60 Hz frame, never zero.
//! - Callbacks run in insertion order, every tick, and are never removed.

mod callbacks;
mod clock;
mod frame_loop;
mod stats;
mod timer;

pub use callbacks::{FrameCallbacks, FrameFn};
pub use clock::{BOOTSTRAP_STEP_MS, DEFAULT_MAX_DELTA_MS, FrameClock, FrameTime};
pub use frame_loop::FrameLoop;
pub use stats::FrameTimer;
pub use timer::{TimerHandle, TimerQueue};
