use std::time::Duration;

/// Handle to a scheduled action, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<A> {
    handle: TimerHandle,
    due_ms: f64,
    action: A,
}

/// One-shot deferred actions on the frame clock's timeline.
///
/// Nothing fires by itself: the owner polls [`take_due`](Self::take_due)
/// from the UI thread. Dropping or [`clear`](Self::clear)ing the queue
/// cancels everything still pending.
#[derive(Debug)]
pub struct TimerQueue<A> {
    pending: Vec<Pending<A>>,
    next_id: u64,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `action` to become due `delay` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay: Duration, action: A) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        let due_ms = now_ms + delay.as_secs_f64() * 1000.0;
        tracing::debug!(?handle, due_ms, "timer scheduled");
        self.pending.push(Pending {
            handle,
            due_ms,
            action,
        });
        handle
    }

    /// Cancel a pending action. Returns `false` if it already fired or was
    /// cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.handle != handle);
        let cancelled = self.pending.len() != before;
        if cancelled {
            tracing::debug!(?handle, "timer cancelled");
        }
        cancelled
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every action due at `now_ms`, earliest first.
    /// Actions due at the same time keep scheduling order.
    pub fn take_due(&mut self, now_ms: f64) -> Vec<A> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_ms <= now_ms {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due_ms.total_cmp(&b.due_ms).then(a.handle.cmp(&b.handle)));
        due.into_iter().map(|p| p.action).collect()
    }

    /// Cancel everything.
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(count = self.pending.len(), "pending timers cancelled");
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_after_delay() {
        let mut timers = TimerQueue::new();
        timers.schedule(100.0, Duration::from_secs(2), "resize");
        assert!(timers.take_due(1_000.0).is_empty());
        assert!(timers.take_due(2_099.0).is_empty());
        assert_eq!(timers.take_due(2_100.0), vec!["resize"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn fires_only_once() {
        let mut timers = TimerQueue::new();
        timers.schedule(0.0, Duration::from_millis(10), 1);
        assert_eq!(timers.take_due(20.0), vec![1]);
        assert!(timers.take_due(30.0).is_empty());
    }

    #[test]
    fn cancelled_action_never_fires() {
        let mut timers = TimerQueue::new();
        let h = timers.schedule(0.0, Duration::from_millis(10), "x");
        assert!(timers.is_pending(h));
        assert!(timers.cancel(h));
        assert!(!timers.cancel(h));
        assert!(timers.take_due(1_000.0).is_empty());
    }

    #[test]
    fn due_actions_in_time_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(0.0, Duration::from_millis(30), "late");
        timers.schedule(0.0, Duration::from_millis(10), "early");
        timers.schedule(0.0, Duration::from_millis(10), "early-2");
        assert_eq!(timers.take_due(50.0), vec!["early", "early-2", "late"]);
    }

    #[test]
    fn clear_cancels_everything() {
        let mut timers = TimerQueue::new();
        timers.schedule(0.0, Duration::from_millis(1), ());
        timers.schedule(0.0, Duration::from_millis(2), ());
        timers.clear();
        assert_eq!(timers.len(), 0);
        assert!(timers.take_due(10.0).is_empty());
    }
}
