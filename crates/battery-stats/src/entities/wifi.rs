use std::fmt::Write as _;
use std::sync::Arc;

use log::debug;

use super::{mah, CalcEnv, CounterMap, PowerMap, StatsEntity, TimerMap};
use crate::accumulator::{ActiveTimer, Counter};
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Wi-Fi on time for the device; per-app scans and transfers.
///
/// Scan power is charged per scan (`wifi_scan` is a cost per scan, not a
/// current), so scans are counted. The scan timer is kept for time queries.
#[derive(Debug)]
pub struct WifiEntity {
    on_timer: ActiveTimer,
    scan: TimerMap,
    scan_count: CounterMap,
    rx: TimerMap,
    tx: TimerMap,
    rx_bytes: CounterMap,
    tx_bytes: CounterMap,
    app_power: PowerMap,
    power_mah: f64,
}

impl WifiEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            on_timer: ActiveTimer::new(base.clone()),
            scan: TimerMap::new(base.clone()),
            scan_count: CounterMap::default(),
            rx: TimerMap::new(base.clone()),
            tx: TimerMap::new(base),
            rx_bytes: CounterMap::default(),
            tx_bytes: CounterMap::default(),
            app_power: PowerMap::default(),
            power_mah: 0.0,
        }
    }

    fn on_power(&mut self, env: &CalcEnv<'_>) -> f64 {
        mah(
            env.table.average_power_ma(keys::WIFI_ON),
            self.on_timer.running_time_ms(),
        )
    }

    fn app_part(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::WifiScan => {
                env.table.average_power_ma(keys::WIFI_SCAN) * self.scan_count.count(uid) as f64
            }
            StatsType::WifiRx => mah(
                env.table.average_power_ma(keys::WIFI_RX),
                self.rx.time_ms(uid),
            ),
            StatsType::WifiTx => mah(
                env.table.average_power_ma(keys::WIFI_TX),
                self.tx.time_ms(uid),
            ),
            _ => 0.0,
        }
    }
}

impl StatsEntity for WifiEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Wifi
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            let power = self.app_part(StatsType::WifiScan, uid, env)
                + self.app_part(StatsType::WifiRx, uid, env)
                + self.app_part(StatsType::WifiTx, uid, env);
            self.app_power.set(uid, power);
            return None;
        }
        self.power_mah = self.on_power(env) + self.app_power.sum();
        debug!("wifi hardware power {:.6}mAh", self.power_mah);
        Some(StatsInfo::hardware(ConsumptionType::Wifi, self.power_mah))
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
            StatsType::WifiOn => self.on_power(env),
            other => self.app_part(other, uid, env),
        }
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::WifiOn => Some(&mut self.on_timer),
            StatsType::WifiScan => Some(self.scan.get_or_create(uid)),
            StatsType::WifiRx => Some(self.rx.get_or_create(uid)),
            StatsType::WifiTx => Some(self.tx.get_or_create(uid)),
            _ => None,
        }
    }

    fn counter(&mut self, stats_type: StatsType, uid: i32) -> Option<&mut Counter> {
        match stats_type {
            StatsType::WifiScan => Some(self.scan_count.get_or_create(uid)),
            StatsType::WifiRx => Some(self.rx_bytes.get_or_create(uid)),
            StatsType::WifiTx => Some(self.tx_bytes.get_or_create(uid)),
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::WifiOn => self.on_timer.running_time_ms(),
            StatsType::WifiScan => self.scan.time_ms(uid),
            StatsType::WifiRx => self.rx.time_ms(uid),
            StatsType::WifiTx => self.tx.time_ms(uid),
            _ => 0,
        }
    }

    fn traffic_bytes(&self, stats_type: StatsType, uid: i32) -> i64 {
        match stats_type {
            StatsType::WifiRx => self.rx_bytes.count(uid),
            StatsType::WifiTx => self.tx_bytes.count(uid),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.app_power.zero_all();
        self.on_timer.reset();
        self.scan.reset_all();
        self.scan_count.reset_all();
        self.rx.reset_all();
        self.tx.reset_all();
        self.rx_bytes.reset_all();
        self.tx_bytes.reset_all();
    }

    fn dump(&mut self, out: &mut String) {
        let on_ms = self.on_timer.running_time_ms();
        let _ = writeln!(out, "Wifi on time: {}ms", on_ms);
        let _ = writeln!(out, "Wifi power: {:.6}mAh", self.power_mah);
    }
}
