//! Monotonic clock sources for the on-battery time base.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Source of the two monotonic clocks the time base needs.
///
/// `None` means the read failed; callers treat it as "no time passed".
pub trait Clock: Send + Sync {
    /// Milliseconds since boot, including time spent suspended.
    fn boot_time_ms(&self) -> Option<i64>;
    /// Milliseconds since boot, excluding time spent suspended.
    fn up_time_ms(&self) -> Option<i64>;
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const BOOT_CLOCK: libc::clockid_t = libc::CLOCK_BOOTTIME;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const BOOT_CLOCK: libc::clockid_t = libc::CLOCK_MONOTONIC;

/// Kernel clocks: CLOCK_BOOTTIME for boot time and CLOCK_MONOTONIC for up time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    fn read(id: libc::clockid_t) -> Option<i64> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, exclusively borrowed timespec for the call.
        let rc = unsafe { libc::clock_gettime(id, &mut ts) };
        if rc != 0 {
            return None;
        }
        Some(ts.tv_sec as i64 * 1000 + ts.tv_nsec as i64 / 1_000_000)
    }
}

impl Clock for SystemClock {
    fn boot_time_ms(&self) -> Option<i64> {
        Self::read(BOOT_CLOCK)
    }

    fn up_time_ms(&self) -> Option<i64> {
        Self::read(libc::CLOCK_MONOTONIC)
    }
}

/// Hand-driven clock for tests and replay tools.
#[derive(Debug, Default)]
pub struct ManualClock {
    boot_ms: AtomicI64,
    up_ms: AtomicI64,
    failing: AtomicBool,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance both clocks by `ms`.
    pub fn advance(&self, ms: i64) {
        self.boot_ms.fetch_add(ms, Ordering::SeqCst);
        self.up_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Advance only the boot clock, as if the device was suspended for `ms`.
    pub fn suspend(&self, ms: i64) {
        self.boot_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Make subsequent reads fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn boot_time_ms(&self) -> Option<i64> {
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.boot_ms.load(Ordering::SeqCst))
    }

    fn up_time_ms(&self) -> Option<i64> {
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.up_ms.load(Ordering::SeqCst))
    }
}
