use std::sync::Arc;

use super::{mah, CalcEnv, PowerMap, StatsEntity, TimerMap};
use crate::accumulator::ActiveTimer;
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// An app-attributed component charged as one current over one per-uid
/// timer: camera, flashlight, GPS, audio and wakelocks.
#[derive(Debug)]
pub struct UidTimerEntity {
    consumption_type: ConsumptionType,
    stats_type: StatsType,
    key: &'static str,
    timers: TimerMap,
    power: PowerMap,
}

impl UidTimerEntity {
    fn new(
        base: Arc<TimeBase>,
        consumption_type: ConsumptionType,
        stats_type: StatsType,
        key: &'static str,
    ) -> Self {
        Self {
            consumption_type,
            stats_type,
            key,
            timers: TimerMap::new(base),
            power: PowerMap::default(),
        }
    }

    pub fn camera(base: Arc<TimeBase>) -> Self {
        Self::new(base, ConsumptionType::Camera, StatsType::CameraOn, keys::CAMERA_ON)
    }

    pub fn flashlight(base: Arc<TimeBase>) -> Self {
        Self::new(
            base,
            ConsumptionType::Flashlight,
            StatsType::FlashlightOn,
            keys::FLASHLIGHT_ON,
        )
    }

    pub fn gps(base: Arc<TimeBase>) -> Self {
        Self::new(base, ConsumptionType::Gps, StatsType::GpsOn, keys::GPS_ON)
    }

    pub fn audio(base: Arc<TimeBase>) -> Self {
        Self::new(base, ConsumptionType::Audio, StatsType::AudioOn, keys::AUDIO_ON)
    }

    pub fn wakelock(base: Arc<TimeBase>) -> Self {
        Self::new(
            base,
            ConsumptionType::Wakelock,
            StatsType::WakelockHold,
            keys::CPU_AWAKE,
        )
    }

    fn power_for(&mut self, uid: i32, env: &CalcEnv<'_>) -> f64 {
        mah(env.table.average_power_ma(self.key), self.timers.time_ms(uid))
    }
}

impl StatsEntity for UidTimerEntity {
    fn consumption_type(&self) -> ConsumptionType {
        self.consumption_type
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid <= INVALID_VALUE {
            return None;
        }
        let power = self.power_for(uid, env);
        self.power.set(uid, power);
        None
    }

    fn entity_power_mah(&self, uid: i32) -> f64 {
        self.power.get(uid)
    }

    fn stats_power_mah(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        if stats_type != self.stats_type {
            return 0.0;
        }
        self.power_for(uid, env)
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        if stats_type != self.stats_type {
            return None;
        }
        Some(self.timers.get_or_create(uid))
    }

    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> i64 {
        if stats_type != self.stats_type {
            return 0;
        }
        self.timers.time_ms(uid)
    }

    fn reset(&mut self) {
        self.power.zero_all();
        self.timers.reset_all();
    }
}
