//! Per-subsystem power accounting.
//!
//! Every subsystem is an entity that owns its timers and counters and turns
//! them into mAh with the average power table. Hardware entities publish a
//! row for the whole device; per-app entities keep a uid -> mAh map that the
//! app roll-up sums.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::accumulator::{ActiveTimer, Counter};
use crate::cpu_time_reader::CpuTimeSource;
use crate::power_table::AveragePowerTable;
use crate::time_base::TimeBase;
use crate::types::{ConsumptionType, StatsInfo, StatsType, MS_IN_HOUR};

mod app;
mod bluetooth;
mod cpu;
mod idle;
mod phone;
mod radio;
mod screen;
mod sensor;
mod uid_counter;
mod uid_timer;
mod wifi;

pub use app::{AppEntity, UserEntity};
pub use bluetooth::BluetoothEntity;
pub use cpu::CpuEntity;
pub use idle::IdleEntity;
pub use phone::PhoneEntity;
pub use radio::RadioEntity;
pub use screen::ScreenEntity;
pub use sensor::SensorEntity;
pub use uid_counter::UidCounterEntity;
pub use uid_timer::UidTimerEntity;
pub use wifi::WifiEntity;

/// What an entity may consult while computing power.
pub struct CalcEnv<'a> {
    pub table: &'a AveragePowerTable,
    pub cpu: &'a dyn CpuTimeSource,
}

pub trait StatsEntity: Send {
    fn consumption_type(&self) -> ConsumptionType;

    /// Recompute power. With a uid above -1 only that app's share is
    /// updated; with the -1 sentinel a hardware entity recomputes its
    /// device-wide total and returns the row to publish.
    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo>;

    /// Power from the last `calculate`, 0 when unknown.
    fn entity_power_mah(&self, uid: i32) -> f64;

    /// Live power of one sub-component, 0 for types this entity does not own.
    fn stats_power_mah(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64;

    fn timer(&mut self, _stats_type: StatsType, _uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        None
    }

    fn counter(&mut self, _stats_type: StatsType, _uid: i32) -> Option<&mut Counter> {
        None
    }

    fn active_time_ms(&mut self, _stats_type: StatsType, _uid: i32, _level: i16) -> i64 {
        0
    }

    fn traffic_bytes(&self, _stats_type: StatsType, _uid: i32) -> i64 {
        0
    }

    /// Zero every power figure and accumulator, keeping map entries.
    fn reset(&mut self);

    fn dump(&mut self, _out: &mut String) {}
}

pub(crate) fn mah(average_ma: f64, time_ms: i64) -> f64 {
    average_ma * time_ms as f64 / MS_IN_HOUR
}

/// Lazily created timers keyed by uid or level.
#[derive(Debug)]
pub(crate) struct TimerMap {
    base: Arc<TimeBase>,
    timers: BTreeMap<i32, ActiveTimer>,
}

impl TimerMap {
    pub(crate) fn new(base: Arc<TimeBase>) -> Self {
        Self {
            base,
            timers: BTreeMap::new(),
        }
    }

    pub(crate) fn get_or_create(&mut self, key: i32) -> &mut ActiveTimer {
        let base = &self.base;
        self.timers
            .entry(key)
            .or_insert_with(|| ActiveTimer::new(base.clone()))
    }

    /// Accumulated time for `key` without creating a timer.
    pub(crate) fn time_ms(&mut self, key: i32) -> i64 {
        self.timers
            .get_mut(&key)
            .map(|t| t.running_time_ms())
            .unwrap_or(0)
    }

    pub(crate) fn keys(&self) -> Vec<i32> {
        self.timers.keys().copied().collect()
    }

    pub(crate) fn reset_all(&mut self) {
        for t in self.timers.values_mut() {
            t.reset();
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CounterMap {
    counters: BTreeMap<i32, Counter>,
}

impl CounterMap {
    pub(crate) fn get_or_create(&mut self, key: i32) -> &mut Counter {
        self.counters.entry(key).or_default()
    }

    pub(crate) fn count(&self, key: i32) -> i64 {
        self.counters.get(&key).map(|c| c.count()).unwrap_or(0)
    }

    pub(crate) fn reset_all(&mut self) {
        for c in self.counters.values_mut() {
            c.reset();
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PowerMap {
    power: BTreeMap<i32, f64>,
}

impl PowerMap {
    pub(crate) fn set(&mut self, uid: i32, mah: f64) {
        self.power.insert(uid, mah);
    }

    pub(crate) fn get(&self, uid: i32) -> f64 {
        self.power.get(&uid).copied().unwrap_or(0.0)
    }

    pub(crate) fn sum(&self) -> f64 {
        self.power.values().sum()
    }

    pub(crate) fn zero_all(&mut self) {
        for v in self.power.values_mut() {
            *v = 0.0;
        }
    }
}

/// Builds the fixed set of part and per-app entities, keyed by the
/// consumption type they account for.
pub fn create_entities(base: &Arc<TimeBase>) -> BTreeMap<ConsumptionType, Box<dyn StatsEntity>> {
    let all: Vec<Box<dyn StatsEntity>> = vec![
        Box::new(BluetoothEntity::new(base.clone())),
        Box::new(IdleEntity::new(base.clone())),
        Box::new(PhoneEntity::new(base.clone())),
        Box::new(RadioEntity::new(base.clone())),
        Box::new(ScreenEntity::new(base.clone())),
        Box::new(WifiEntity::new(base.clone())),
        Box::new(UidTimerEntity::camera(base.clone())),
        Box::new(UidTimerEntity::flashlight(base.clone())),
        Box::new(UidTimerEntity::audio(base.clone())),
        Box::new(UidTimerEntity::gps(base.clone())),
        Box::new(UidTimerEntity::wakelock(base.clone())),
        Box::new(SensorEntity::new(base.clone())),
        Box::new(CpuEntity::new()),
        Box::new(UidCounterEntity::alarm()),
    ];
    all.into_iter().map(|e| (e.consumption_type(), e)).collect()
}
