//! Duration and event accumulators.

use std::sync::Arc;

use log::debug;

use crate::time_base::TimeBase;

/// Start/stop duration accumulator on the on-battery time axis.
#[derive(Debug)]
pub struct ActiveTimer {
    base: Arc<TimeBase>,
    running: bool,
    start_ms: i64,
    total_ms: i64,
}

impl ActiveTimer {
    pub fn new(base: Arc<TimeBase>) -> Self {
        let start_ms = base.on_battery_boot_time_ms();
        Self {
            base,
            running: false,
            start_ms,
            total_ms: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start_running(&mut self) {
        if self.running {
            debug!("timer already running, ignoring start");
            return;
        }
        self.start_ms = self.base.on_battery_boot_time_ms();
        self.running = true;
    }

    pub fn stop_running(&mut self) {
        if !self.running {
            return;
        }
        self.fold_live();
        self.running = false;
    }

    /// Total accumulated time. A running timer folds its live interval in
    /// and restarts from now, so polling never double counts.
    pub fn running_time_ms(&mut self) -> i64 {
        if self.running {
            self.fold_live();
        }
        self.total_ms
    }

    /// Add a duration measured elsewhere. Non-positive values are ignored.
    pub fn add_running_time_ms(&mut self, delta_ms: i64) {
        if delta_ms <= 0 {
            debug!("ignoring non-positive running time {}ms", delta_ms);
            return;
        }
        self.total_ms += delta_ms;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.start_ms = self.base.on_battery_boot_time_ms();
        self.total_ms = 0;
    }

    fn fold_live(&mut self) {
        let now = self.base.on_battery_boot_time_ms();
        self.total_ms += (now - self.start_ms).max(0);
        self.start_ms = now;
    }
}

/// Increment-only event or byte counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    total: i64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta`; non-positive values are ignored.
    pub fn add_count(&mut self, delta: i64) {
        if delta <= 0 {
            debug!("ignoring non-positive count {}", delta);
            return;
        }
        self.total += delta;
    }

    pub fn count(&self) -> i64 {
        self.total
    }

    pub fn reset(&mut self) {
        self.total = 0;
    }
}
