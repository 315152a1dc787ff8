use std::time::{Duration, Instant};

/// Wrapper for periodically emitting a progress percentage during a long running process
pub struct ProgressTracker<F> {
    total: usize,
    current: usize,
    interval: Duration,
    last_update_time: Instant,
    last_percentage: u32,
    update_fn: F,
}

impl<F> ProgressTracker<F>
where
    F: Fn(u32),
{
    /// Create a new `ProgressTracker` with total count, minimum interval between
    /// updates and update function
    pub fn new(total: usize, interval: Duration, update_fn: F) -> Self {
        Self {
            total,
            current: 0,
            interval,
            last_update_time: Instant::now(),
            last_percentage: 0,
            update_fn,
        }
    }

    /// Add `count` toward the progress
    pub fn add(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.current = (self.current + count).min(self.total);
        let progress = self.percentage();
        let should_update = if self.current >= self.total {
            self.last_percentage < 100
        } else if progress != self.last_percentage {
            self.last_update_time.elapsed() >= self.interval
        } else {
            false
        };
        if !should_update {
            return;
        }
        self.last_update_time = Instant::now();
        self.last_percentage = progress;
        (self.update_fn)(progress);
    }

    /// Report 100% if it hasn't been reported yet
    pub fn finish(&mut self) {
        if self.last_percentage < 100 {
            self.current = self.total;
            self.last_percentage = 100;
            (self.update_fn)(100);
        }
    }

    /// Current percentage between 0 and 100
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.current as f64 / self.total as f64 * 100.0) as u32
    }
}
