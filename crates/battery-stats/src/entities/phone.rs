use std::fmt::Write as _;
use std::sync::Arc;

use super::{mah, CalcEnv, StatsEntity};
use crate::accumulator::ActiveTimer;
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Time spent in an active call.
#[derive(Debug)]
pub struct PhoneEntity {
    active_timer: ActiveTimer,
    power_mah: f64,
}

impl PhoneEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            active_timer: ActiveTimer::new(base),
            power_mah: 0.0,
        }
    }

    fn active_power(&mut self, env: &CalcEnv<'_>) -> f64 {
        mah(
            env.table.average_power_ma(keys::RADIO_ACTIVE),
            self.active_timer.running_time_ms(),
        )
    }
}

impl StatsEntity for PhoneEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Phone
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            return None;
        }
        self.power_mah = self.active_power(env);
        Some(StatsInfo::hardware(ConsumptionType::Phone, self.power_mah))
    }

    fn entity_power_mah(&self, uid: i32) -> f64 {
        if uid > INVALID_VALUE {
            0.0
        } else {
            self.power_mah
        }
    }

    fn stats_power_mah(&mut self, stats_type: StatsType, _uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::PhoneActive => self.active_power(env),
            _ => 0.0,
        }
    }

    fn timer(&mut self, stats_type: StatsType, _uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::PhoneActive => Some(&mut self.active_timer),
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, _uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::PhoneActive => self.active_timer.running_time_ms(),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.active_timer.reset();
    }

    fn dump(&mut self, out: &mut String) {
        let ms = self.active_timer.running_time_ms();
        let _ = writeln!(out, "Phone active time: {}ms", ms);
        let _ = writeln!(out, "Phone power: {:.6}mAh", self.power_mah);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_two_seconds_at_fifty_ma() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"radio_active": 50}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut phone = PhoneEntity::new(tb);
        phone.timer(StatsType::PhoneActive, -1, -1).unwrap().start_running();
        clock.advance(2_000);
        phone.timer(StatsType::PhoneActive, -1, -1).unwrap().stop_running();

        let row = phone.calculate(-1, &env).unwrap();
        assert!((row.power_mah - 0.027_78).abs() < 1e-4);
        assert_eq!(phone.active_time_ms(StatsType::PhoneActive, -1, -1), 2_000);
        assert!(phone.calculate(10_000, &env).is_none());
        assert_eq!(phone.entity_power_mah(10_000), 0.0);
    }

    #[test]
    fn test_nothing_accrues_off_battery() {
        let (clock, tb) = on_battery();
        tb.set_on_battery(false);
        let t = table(r#"{"radio_active": 50}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut phone = PhoneEntity::new(tb);
        phone.timer(StatsType::PhoneActive, -1, -1).unwrap().start_running();
        clock.advance(60_000);
        assert_eq!(phone.calculate(-1, &env).unwrap().power_mah, 0.0);
    }
}
