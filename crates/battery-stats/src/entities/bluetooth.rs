use std::fmt::Write as _;
use std::sync::Arc;

use log::debug;

use super::{mah, CalcEnv, CounterMap, PowerMap, StatsEntity, TimerMap};
use crate::accumulator::{ActiveTimer, Counter};
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Radio-on time for the device plus per-app scan and transfer time.
#[derive(Debug)]
pub struct BluetoothEntity {
    on_timer: ActiveTimer,
    scan: TimerMap,
    rx: TimerMap,
    tx: TimerMap,
    rx_bytes: CounterMap,
    tx_bytes: CounterMap,
    app_power: PowerMap,
    power_mah: f64,
}

impl BluetoothEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            on_timer: ActiveTimer::new(base.clone()),
            scan: TimerMap::new(base.clone()),
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
            env.table.average_power_ma(keys::BLUETOOTH_ON),
            self.on_timer.running_time_ms(),
        )
    }

    fn app_part(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::BluetoothScan => mah(
                env.table.average_power_ma(keys::BLUETOOTH_SCAN),
                self.scan.time_ms(uid),
            ),
            StatsType::BluetoothRx => mah(
                env.table.average_power_ma(keys::BLUETOOTH_RX),
                self.rx.time_ms(uid),
            ),
            StatsType::BluetoothTx => mah(
                env.table.average_power_ma(keys::BLUETOOTH_TX),
                self.tx.time_ms(uid),
            ),
            _ => 0.0,
        }
    }
}

impl StatsEntity for BluetoothEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Bluetooth
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            let power = self.app_part(StatsType::BluetoothScan, uid, env)
                + self.app_part(StatsType::BluetoothRx, uid, env)
                + self.app_part(StatsType::BluetoothTx, uid, env);
            self.app_power.set(uid, power);
            return None;
        }
        self.power_mah = self.on_power(env) + self.app_power.sum();
        debug!("bluetooth hardware power {:.6}mAh", self.power_mah);
        Some(StatsInfo::hardware(ConsumptionType::Bluetooth, self.power_mah))
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
            StatsType::BluetoothOn => self.on_power(env),
            other => self.app_part(other, uid, env),
        }
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::BluetoothOn => Some(&mut self.on_timer),
            StatsType::BluetoothScan => Some(self.scan.get_or_create(uid)),
            StatsType::BluetoothRx => Some(self.rx.get_or_create(uid)),
            StatsType::BluetoothTx => Some(self.tx.get_or_create(uid)),
            _ => None,
        }
    }

    fn counter(&mut self, stats_type: StatsType, uid: i32) -> Option<&mut Counter> {
        match stats_type {
            StatsType::BluetoothRx => Some(self.rx_bytes.get_or_create(uid)),
            StatsType::BluetoothTx => Some(self.tx_bytes.get_or_create(uid)),
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::BluetoothOn => self.on_timer.running_time_ms(),
            StatsType::BluetoothScan => self.scan.time_ms(uid),
            StatsType::BluetoothRx => self.rx.time_ms(uid),
            StatsType::BluetoothTx => self.tx.time_ms(uid),
            _ => 0,
        }
    }

    fn traffic_bytes(&self, stats_type: StatsType, uid: i32) -> i64 {
        match stats_type {
            StatsType::BluetoothRx => self.rx_bytes.count(uid),
            StatsType::BluetoothTx => self.tx_bytes.count(uid),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.app_power.zero_all();
        self.on_timer.reset();
        self.scan.reset_all();
        self.rx.reset_all();
        self.tx.reset_all();
        self.rx_bytes.reset_all();
        self.tx_bytes.reset_all();
    }

    fn dump(&mut self, out: &mut String) {
        let on_ms = self.on_timer.running_time_ms();
        let _ = writeln!(out, "Bluetooth on time: {}ms", on_ms);
        let _ = writeln!(out, "Bluetooth power: {:.6}mAh", self.power_mah);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_hardware_includes_app_share() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"bluetooth_on": 36, "bluetooth_scan": 72}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut bt = BluetoothEntity::new(tb);
        bt.timer(StatsType::BluetoothOn, -1, -1).unwrap().start_running();
        bt.timer(StatsType::BluetoothScan, 10_010, -1)
            .unwrap()
            .start_running();
        clock.advance(100_000);

        assert!(bt.calculate(10_010, &env).is_none());
        assert!(approx(bt.entity_power_mah(10_010), 2.0));
        let row = bt.calculate(-1, &env).unwrap();
        assert_eq!(row.consumption_type, ConsumptionType::Bluetooth);
        assert_eq!(row.uid, -1);
        assert!(approx(row.power_mah, 3.0));
        assert!(approx(bt.stats_power_mah(StatsType::BluetoothOn, -1, &env), 1.0));
        assert_eq!(bt.stats_power_mah(StatsType::WifiOn, -1, &env), 0.0);
    }

    #[test]
    fn test_traffic_bytes_per_uid() {
        let (_clock, tb) = on_battery();
        let mut bt = BluetoothEntity::new(tb);
        bt.counter(StatsType::BluetoothRx, 7).unwrap().add_count(512);
        bt.counter(StatsType::BluetoothRx, 7).unwrap().add_count(-3);
        bt.counter(StatsType::BluetoothTx, 8).unwrap().add_count(64);
        assert_eq!(bt.traffic_bytes(StatsType::BluetoothRx, 7), 512);
        assert_eq!(bt.traffic_bytes(StatsType::BluetoothTx, 7), 0);
        assert_eq!(bt.traffic_bytes(StatsType::BluetoothTx, 8), 64);
        assert!(bt.counter(StatsType::BluetoothScan, 7).is_none());
        assert!(bt.timer(StatsType::WifiScan, 7, -1).is_none());
    }
}
