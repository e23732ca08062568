//! Battery power accounting.
//!
//! Activity events (radio state, screen brightness, scans, sensors,
//! wakelocks, traffic) drive on-battery timers and counters. Combined with
//! an average-current table and per-uid CPU time read from the kernel they
//! yield mAh per app, per hardware part and per user.

pub use error::{Error, Result};

mod error;
mod provider;
pub use provider::{FsProvider, RealFs};

pub mod accumulator;
pub mod clock;
pub mod cpu_time_reader;
pub mod entities;
pub mod power_table;
pub mod stats_core;
pub mod time_base;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use accumulator::{ActiveTimer, Counter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cpu_time_reader::{CpuTimeReader, CpuTimeReaderConfig, CpuTimeSource};
pub use power_table::AveragePowerTable;
pub use stats_core::{BatteryStatsCore, CoreConfig};
pub use time_base::TimeBase;
pub use types::{ConsumptionType, StatsEvent, StatsInfo, StatsState, StatsType};
