/// Progress callback: receives a percentage in `0..=100`.
pub type ProgressFn = Box<dyn Fn(u8) + Send + Sync>;

/// Emits progress at 10-percent steps and guarantees that 100 is only ever
/// reported through [`ProgressTracker::finish`] — long-running imports must
/// not look done while chunks are still settling.
pub struct ProgressTracker {
    callback: Option<ProgressFn>,
    last_emitted: u8,
}

impl ProgressTracker {
    pub fn new(callback: Option<ProgressFn>) -> Self {
        Self {
            callback,
            last_emitted: 0,
        }
    }

    /// Report work at `percent` complete. Values are clamped to 99 and only
    /// forwarded when they cross a new 10-percent step.
    pub fn update(&mut self, percent: u8) {
        let percent = percent.min(99);
        let step = percent - percent % 10;
        if step > self.last_emitted {
            self.last_emitted = step;
            if let Some(cb) = &self.callback {
                cb(step);
            }
        }
    }

    /// Terminal completion signal.
    pub fn finish(&mut self) {
        self.last_emitted = 100;
        if let Some(cb) = &self.callback {
            cb(100);
        }
    }
}
