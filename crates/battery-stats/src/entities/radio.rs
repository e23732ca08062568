use std::fmt::Write as _;
use std::sync::Arc;

use log::{debug, warn};

use super::{mah, CalcEnv, CounterMap, PowerMap, StatsEntity, TimerMap};
use crate::accumulator::{ActiveTimer, Counter};
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE, RADIO_SIGNAL_BIN};

/// Cellular radio: network search time, time per signal level and per-app
/// data transfer.
#[derive(Debug)]
pub struct RadioEntity {
    scan_timer: ActiveTimer,
    levels: TimerMap,
    rx: TimerMap,
    tx: TimerMap,
    rx_bytes: CounterMap,
    tx_bytes: CounterMap,
    app_power: PowerMap,
    power_mah: f64,
}

impl RadioEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            scan_timer: ActiveTimer::new(base.clone()),
            levels: TimerMap::new(base.clone()),
            rx: TimerMap::new(base.clone()),
            tx: TimerMap::new(base),
            rx_bytes: CounterMap::default(),
            tx_bytes: CounterMap::default(),
            app_power: PowerMap::default(),
            power_mah: 0.0,
        }
    }

    fn scan_power(&mut self, env: &CalcEnv<'_>) -> f64 {
        mah(
            env.table.average_power_ma(keys::RADIO_SCAN),
            self.scan_timer.running_time_ms(),
        )
    }

    fn signal_power(&mut self, env: &CalcEnv<'_>) -> f64 {
        let mut power = 0.0;
        for level in self.levels.keys() {
            let ms = self.levels.time_ms(level);
            power += mah(env.table.average_power_ma_at(keys::RADIO_ON, level), ms);
        }
        power
    }

    fn app_part(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::RadioRx => mah(
                env.table.average_power_ma(keys::RADIO_RX),
                self.rx.time_ms(uid),
            ),
            StatsType::RadioTx => mah(
                env.table.average_power_ma(keys::RADIO_TX),
                self.tx.time_ms(uid),
            ),
            _ => 0.0,
        }
    }
}

impl StatsEntity for RadioEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Radio
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            let power = self.app_part(StatsType::RadioRx, uid, env)
                + self.app_part(StatsType::RadioTx, uid, env);
            self.app_power.set(uid, power);
            return None;
        }
        self.power_mah = self.scan_power(env) + self.signal_power(env) + self.app_power.sum();
        debug!("radio hardware power {:.6}mAh", self.power_mah);
        Some(StatsInfo::hardware(ConsumptionType::Radio, self.power_mah))
    }

    fn entity_power_mah(&self, uid: i32) -> f64 {
        if uid > INVALID_VALUE {
            self.app_power.get(uid)
        } else {
            self.power_mah
        }
    }

    fn stats_power_mah(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::RadioOn => self.signal_power(env),
            StatsType::RadioScan => self.scan_power(env),
            other => self.app_part(other, uid, env),
        }
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::RadioScan => Some(&mut self.scan_timer),
            StatsType::RadioOn => {
                if !(0..RADIO_SIGNAL_BIN).contains(&level) {
                    warn!("radio signal level {} out of range", level);
                    return None;
                }
                Some(self.levels.get_or_create(i32::from(level)))
            }
            StatsType::RadioRx => Some(self.rx.get_or_create(uid)),
            StatsType::RadioTx => Some(self.tx.get_or_create(uid)),
            _ => None,
        }
    }

    fn counter(&mut self, stats_type: StatsType, uid: i32) -> Option<&mut Counter> {
        match stats_type {
            StatsType::RadioRx => Some(self.rx_bytes.get_or_create(uid)),
            StatsType::RadioTx => Some(self.tx_bytes.get_or_create(uid)),
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, level: i16) -> i64 {
        match stats_type {
            StatsType::RadioScan => self.scan_timer.running_time_ms(),
            StatsType::RadioOn if level > INVALID_VALUE as i16 => {
                self.levels.time_ms(i32::from(level))
            }
            // no level: total time with any signal
            StatsType::RadioOn => self
                .levels
                .keys()
                .into_iter()
                .map(|l| self.levels.time_ms(l))
                .sum(),
            StatsType::RadioRx => self.rx.time_ms(uid),
            StatsType::RadioTx => self.tx.time_ms(uid),
            _ => 0,
        }
    }

    fn traffic_bytes(&self, stats_type: StatsType, uid: i32) -> i64 {
        match stats_type {
            StatsType::RadioRx => self.rx_bytes.count(uid),
            StatsType::RadioTx => self.tx_bytes.count(uid),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.app_power.zero_all();
        self.scan_timer.reset();
        self.levels.reset_all();
        self.rx.reset_all();
        self.tx.reset_all();
        self.rx_bytes.reset_all();
        self.tx_bytes.reset_all();
    }

    fn dump(&mut self, out: &mut String) {
        let scan_ms = self.scan_timer.running_time_ms();
        let _ = writeln!(out, "Radio scan time: {}ms", scan_ms);
        for level in self.levels.keys() {
            let ms = self.levels.time_ms(level);
            let _ = writeln!(out, "Radio signal level {} time: {}ms", level, ms);
        }
        let _ = writeln!(out, "Radio power: {:.6}mAh", self.power_mah);
    }
}
