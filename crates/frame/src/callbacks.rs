use crate::FrameTime;

/// A per-frame update function. Receives the shared frame state and timing.
pub type FrameFn<S> = Box<dyn FnMut(&mut S, FrameTime)>;

/// Ordered, append-only list of frame callbacks.
///
/// Insertion order is execution order. Callbacks are registered once at
/// startup and live as long as the loop.
pub struct FrameCallbacks<S> {
    entries: Vec<(String, FrameFn<S>)>,
}

impl<S> Default for FrameCallbacks<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> FrameCallbacks<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a callback under a label used for logging.
    pub fn push(&mut self, label: impl Into<String>, callback: impl FnMut(&mut S, FrameTime) + 'static) {
        let label = label.into();
        tracing::debug!(label = %label, index = self.entries.len(), "frame callback registered");
        self.entries.push((label, Box::new(callback)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels in execution order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Invoke every callback once, in insertion order.
    pub fn run(&mut self, state: &mut S, time: FrameTime) {
        for (label, callback) in &mut self.entries {
            tracing::trace!(label = %label, delta = time.delta, "frame callback");
            callback(state, time);
        }
    }
}

impl<S> std::fmt::Debug for FrameCallbacks<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> FrameTime {
        FrameTime {
            delta: 0.016,
            now: 1.0,
        }
    }

    #[test]
    fn runs_in_insertion_order() {
        let mut callbacks: FrameCallbacks<Vec<&'static str>> = FrameCallbacks::new();
        callbacks.push("a", |log, _| log.push("a"));
        callbacks.push("b", |log, _| log.push("b"));
        callbacks.push("c", |log, _| log.push("c"));

        let mut log = Vec::new();
        callbacks.run(&mut log, t());
        callbacks.run(&mut log, t());
        assert_eq!(log, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn callbacks_receive_timing() {
        let mut callbacks: FrameCallbacks<Vec<FrameTime>> = FrameCallbacks::new();
        callbacks.push("record", |seen, time| seen.push(time));
        let mut seen = Vec::new();
        callbacks.run(&mut seen, t());
        assert_eq!(seen, vec![t()]);
    }

    #[test]
    fn labels_in_order() {
        let mut callbacks: FrameCallbacks<()> = FrameCallbacks::new();
        assert!(callbacks.is_empty());
        callbacks.push("detect", |_, _| {});
        callbacks.push("render", |_, _| {});
        assert_eq!(callbacks.len(), 2);
        assert_eq!(callbacks.labels().collect::<Vec<_>>(), vec!["detect", "render"]);
    }

    #[test]
    fn empty_list_is_a_no_op() {
        let mut callbacks: FrameCallbacks<u32> = FrameCallbacks::new();
        let mut state = 7;
        callbacks.run(&mut state, t());
        assert_eq!(state, 7);
    }
}
