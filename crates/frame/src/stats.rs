/// Rolling window of recent frame deltas, in seconds.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: Vec<f64>,
    next: usize,
    len: usize,
}

impl FrameTimer {
    /// Window of `capacity` frames (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![0.0; capacity.max(1)],
            next: 0,
            len: 0,
        }
    }

    pub fn record(&mut self, delta: f64) {
        self.history[self.next] = delta;
        self.next = (self.next + 1) % self.history.len();
        self.len = (self.len + 1).min(self.history.len());
    }

    fn window(&self) -> &[f64] {
        &self.history[..self.len]
    }

    pub fn count(&self) -> usize {
        self.len
    }

    pub fn average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.window().iter().sum::<f64>() / self.len as f64
    }

    pub fn max(&self) -> f64 {
        self.window().iter().copied().fold(0.0, f64::max)
    }

    pub fn min(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.window().iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Frames per second implied by the average delta.
    pub fn fps(&self) -> f64 {
        let avg = self.average();
        if avg > 0.0 { 1.0 / avg } else { 0.0 }
    }
}
