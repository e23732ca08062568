use std::fmt::Write as _;
use std::sync::Arc;

use super::{mah, CalcEnv, StatsEntity};
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Baseline draw of a device sitting on battery.
///
/// Charged from the time base directly rather than from timers:
/// `cpu_suspend` over on-battery boot time plus `cpu_idle` over on-battery
/// awake time, both measured from the baseline taken at the last reset.
#[derive(Debug)]
pub struct IdleEntity {
    base: Arc<TimeBase>,
    boot_baseline_ms: i64,
    up_baseline_ms: i64,
    power_mah: f64,
}

impl IdleEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        let mut idle = Self {
            base,
            boot_baseline_ms: 0,
            up_baseline_ms: 0,
            power_mah: 0.0,
        };
        idle.capture_baseline();
        idle
    }

    fn capture_baseline(&mut self) {
        self.boot_baseline_ms = self.base.on_battery_boot_time_ms();
        self.up_baseline_ms = self.base.on_battery_up_time_ms();
    }

    fn suspend_ms(&self) -> i64 {
        (self.base.on_battery_boot_time_ms() - self.boot_baseline_ms).max(0)
    }

    fn awake_ms(&self) -> i64 {
        (self.base.on_battery_up_time_ms() - self.up_baseline_ms).max(0)
    }

    fn suspend_power(&self, env: &CalcEnv<'_>) -> f64 {
        mah(env.table.average_power_ma(keys::CPU_SUSPEND), self.suspend_ms())
    }

    fn awake_power(&self, env: &CalcEnv<'_>) -> f64 {
        mah(env.table.average_power_ma(keys::CPU_IDLE), self.awake_ms())
    }
}

impl StatsEntity for IdleEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Idle
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            return None;
        }
        self.power_mah = self.suspend_power(env) + self.awake_power(env);
        Some(StatsInfo::hardware(ConsumptionType::Idle, self.power_mah))
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
            StatsType::CpuSuspend => self.suspend_power(env),
            StatsType::PhoneIdle => self.awake_power(env),
            _ => 0.0,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, _uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::CpuSuspend => self.suspend_ms(),
            StatsType::PhoneIdle => self.awake_ms(),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.capture_baseline();
    }

    fn dump(&mut self, out: &mut String) {
        let _ = writeln!(out, "Idle suspend time: {}ms", self.suspend_ms());
        let _ = writeln!(out, "Idle awake time: {}ms", self.awake_ms());
        let _ = writeln!(out, "Idle power: {:.6}mAh", self.power_mah);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_suspend_and_awake_are_charged_separately() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"cpu_suspend": 3.6, "cpu_idle": 36}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut idle = IdleEntity::new(tb);
        clock.advance(100_000);
        clock.suspend(900_000);

        assert_eq!(idle.active_time_ms(StatsType::CpuSuspend, -1, -1), 1_000_000);
        assert_eq!(idle.active_time_ms(StatsType::PhoneIdle, -1, -1), 100_000);
        let row = idle.calculate(-1, &env).unwrap();
        // 3.6 mA over 1000 s plus 36 mA over 100 s
        assert!(approx(row.power_mah, 1.0 + 1.0));
    }

    #[test]
    fn test_reset_rebases() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"cpu_idle": 36}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut idle = IdleEntity::new(tb);
        clock.advance(100_000);
        assert!(idle.calculate(-1, &env).unwrap().power_mah > 0.0);
        idle.reset();
        assert_eq!(idle.calculate(-1, &env).unwrap().power_mah, 0.0);
        clock.advance(100_000);
        assert!(approx(idle.calculate(-1, &env).unwrap().power_mah, 1.0));
    }
}
