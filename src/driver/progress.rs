//! Reproduces `StaminaModelBuilder.cpp`'s progress cadence
//! (`isShowProgressSet()` / `getShowProgressDelay()`): rather than a raw
//! `println!` on every dequeue, emits one `log::info!` line at most once per
//! `interval`.

use std::time::{Duration, Instant};

pub struct ProgressReporter {
    interval: Duration,
    started: Instant,
    last_report: Instant,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        let now = Instant::now();
        ProgressReporter {
            interval,
            started: now,
            last_report: now,
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::from_secs(5), false)
    }

    /// Call after every state expansion; logs at most once per interval.
    pub fn tick(&mut self, explored: usize) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        if now.duration_since(self.last_report) < self.interval {
            return;
        }
        self.last_report = now;
        let elapsed = now.duration_since(self.started).as_secs_f64().max(1e-9);
        log::info!(
            "Explored {} states in {:.1}s ({:.1} states/second)",
            explored,
            elapsed,
            explored as f64 / elapsed
        );
    }
}
