//! Battery-relative elapsed time.
//!
//! Every timer in the crate measures time on this axis: it only advances
//! while the device is running on battery.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Default)]
struct BaseState {
    on_battery: bool,
    screen_off: bool,
    // None when the clock could not be read at unplug time
    latest_unplug_boot_ms: Option<i64>,
    latest_unplug_up_ms: Option<i64>,
    on_battery_boot_ms: i64,
    on_battery_up_ms: i64,
    // largest value handed out on each axis; reads never go below it
    boot_high_ms: i64,
    up_high_ms: i64,
}

pub struct TimeBase {
    clock: Arc<dyn Clock>,
    state: Mutex<BaseState>,
}

impl fmt::Debug for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock();
        f.debug_struct("TimeBase")
            .field("on_battery", &st.on_battery)
            .field("screen_off", &st.screen_off)
            .field("on_battery_boot_ms", &st.on_battery_boot_ms)
            .finish()
    }
}

impl TimeBase {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            state: Mutex::new(BaseState::default()),
        })
    }

    /// Time base over the kernel clocks.
    pub fn system() -> Arc<Self> {
        Self::new(Arc::new(SystemClock))
    }

    fn lock(&self) -> MutexGuard<'_, BaseState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_on_battery(&self, on_battery: bool) {
        let mut st = self.lock();
        if st.on_battery == on_battery {
            return;
        }
        st.on_battery = on_battery;
        let boot = self.clock.boot_time_ms();
        let up = self.clock.up_time_ms();
        if on_battery {
            st.latest_unplug_boot_ms = boot;
            st.latest_unplug_up_ms = up;
            debug!("unplugged at boot={:?}ms up={:?}ms", boot, up);
        } else {
            st.on_battery_boot_ms += live_delta(st.latest_unplug_boot_ms, boot);
            st.on_battery_up_ms += live_delta(st.latest_unplug_up_ms, up);
            debug!(
                "plugged in, on-battery boot={}ms up={}ms",
                st.on_battery_boot_ms, st.on_battery_up_ms
            );
        }
    }

    pub fn is_on_battery(&self) -> bool {
        self.lock().on_battery
    }

    pub fn set_screen_off(&self, screen_off: bool) {
        self.lock().screen_off = screen_off;
    }

    pub fn is_screen_off(&self) -> bool {
        self.lock().screen_off
    }

    pub fn is_on_battery_screen_off(&self) -> bool {
        let st = self.lock();
        st.on_battery && st.screen_off
    }

    /// Boot-clock milliseconds spent on battery, including the current
    /// session if still unplugged. Never less than a previous reading.
    pub fn on_battery_boot_time_ms(&self) -> i64 {
        let mut st = self.lock();
        let value = if st.on_battery {
            st.on_battery_boot_ms + live_delta(st.latest_unplug_boot_ms, self.clock.boot_time_ms())
        } else {
            st.on_battery_boot_ms
        };
        st.boot_high_ms = st.boot_high_ms.max(value);
        st.boot_high_ms
    }

    /// Up-clock milliseconds spent on battery (suspend excluded).
    pub fn on_battery_up_time_ms(&self) -> i64 {
        let mut st = self.lock();
        let value = if st.on_battery {
            st.on_battery_up_ms + live_delta(st.latest_unplug_up_ms, self.clock.up_time_ms())
        } else {
            st.on_battery_up_ms
        };
        st.up_high_ms = st.up_high_ms.max(value);
        st.up_high_ms
    }
}

// A failed read on either side contributes nothing; a clock going
// backwards is clamped so observers never see negative time.
fn live_delta(since: Option<i64>, now: Option<i64>) -> i64 {
    match (since, now) {
        (Some(since), Some(now)) => (now - since).max(0),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn base() -> (Arc<ManualClock>, Arc<TimeBase>) {
        let clock = Arc::new(ManualClock::new());
        clock.advance(10_000);
        let tb = TimeBase::new(clock.clone());
        (clock, tb)
    }

    #[test]
    fn test_accumulates_only_on_battery() {
        let (clock, tb) = base();
        clock.advance(500);
        assert_eq!(tb.on_battery_boot_time_ms(), 0);

        tb.set_on_battery(true);
        clock.advance(1_000);
        assert_eq!(tb.on_battery_boot_time_ms(), 1_000);

        tb.set_on_battery(false);
        clock.advance(5_000);
        assert_eq!(tb.on_battery_boot_time_ms(), 1_000);

        tb.set_on_battery(true);
        clock.advance(250);
        assert_eq!(tb.on_battery_boot_time_ms(), 1_250);
    }

    #[test]
    fn test_repeated_set_is_noop() {
        let (clock, tb) = base();
        tb.set_on_battery(true);
        clock.advance(300);
        // Re-asserting must not move the unplug mark
        tb.set_on_battery(true);
        clock.advance(300);
        assert_eq!(tb.on_battery_boot_time_ms(), 600);

        tb.set_on_battery(false);
        tb.set_on_battery(false);
        assert_eq!(tb.on_battery_boot_time_ms(), 600);
    }

    #[test]
    fn test_up_time_excludes_suspend() {
        let (clock, tb) = base();
        tb.set_on_battery(true);
        clock.advance(100);
        clock.suspend(900);
        assert_eq!(tb.on_battery_boot_time_ms(), 1_000);
        assert_eq!(tb.on_battery_up_time_ms(), 100);
    }

    #[test]
    fn test_clock_failure_reads_as_no_time() {
        let (clock, tb) = base();
        tb.set_on_battery(true);
        clock.advance(400);
        clock.set_failing(true);
        assert_eq!(tb.on_battery_boot_time_ms(), 0);
        clock.set_failing(false);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
    }

    #[test]
    fn test_clock_failure_holds_last_reading() {
        let (clock, tb) = base();
        tb.set_on_battery(true);
        clock.advance(400);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
        assert_eq!(tb.on_battery_up_time_ms(), 400);
        clock.set_failing(true);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
        assert_eq!(tb.on_battery_up_time_ms(), 400);
        clock.set_failing(false);
        clock.advance(100);
        assert_eq!(tb.on_battery_boot_time_ms(), 500);
    }

    #[test]
    fn test_plug_with_failed_clock_stalls_until_caught_up() {
        let (clock, tb) = base();
        tb.set_on_battery(true);
        clock.advance(400);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
        // the session cannot be folded, so the axis stalls at 400
        clock.set_failing(true);
        tb.set_on_battery(false);
        clock.set_failing(false);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
        tb.set_on_battery(true);
        clock.advance(300);
        assert_eq!(tb.on_battery_boot_time_ms(), 400);
        clock.advance(200);
        assert_eq!(tb.on_battery_boot_time_ms(), 500);
    }

    #[test]
    fn test_unplug_with_failed_clock_stalls_session() {
        let (clock, tb) = base();
        clock.set_failing(true);
        tb.set_on_battery(true);
        clock.set_failing(false);
        clock.advance(700);
        assert_eq!(tb.on_battery_boot_time_ms(), 0);
        tb.set_on_battery(false);
        assert_eq!(tb.on_battery_boot_time_ms(), 0);
    }

    #[test]
    fn test_screen_off_flag() {
        let (_clock, tb) = base();
        tb.set_screen_off(true);
        assert!(tb.is_screen_off());
        assert!(!tb.is_on_battery_screen_off());
        tb.set_on_battery(true);
        assert!(tb.is_on_battery_screen_off());
    }
}
