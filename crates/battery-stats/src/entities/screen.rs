use std::fmt::Write as _;
use std::sync::Arc;

use log::warn;

use super::{mah, CalcEnv, StatsEntity, TimerMap};
use crate::accumulator::ActiveTimer;
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Screen-on time, bucketed by brightness level.
///
/// Each level is charged `screen_brightness * level + screen_on` mA, so a
/// brighter panel costs proportionally more on top of the base current.
#[derive(Debug)]
pub struct ScreenEntity {
    on_timer: ActiveTimer,
    brightness: TimerMap,
    power_mah: f64,
}

impl ScreenEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            on_timer: ActiveTimer::new(base.clone()),
            brightness: TimerMap::new(base),
            power_mah: 0.0,
        }
    }

    fn screen_power(&mut self, env: &CalcEnv<'_>) -> f64 {
        let on_ma = env.table.average_power_ma(keys::SCREEN_ON);
        let step_ma = env.table.average_power_ma(keys::SCREEN_BRIGHTNESS);
        let mut power = 0.0;
        for level in self.brightness.keys() {
            let ms = self.brightness.time_ms(level);
            power += mah(step_ma * f64::from(level) + on_ma, ms);
        }
        power
    }
}

impl StatsEntity for ScreenEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Screen
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid > INVALID_VALUE {
            return None;
        }
        self.power_mah = self.screen_power(env);
        Some(StatsInfo::hardware(ConsumptionType::Screen, self.power_mah))
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
            StatsType::ScreenOn | StatsType::ScreenBrightness => self.screen_power(env),
            _ => 0.0,
        }
    }

    fn timer(&mut self, stats_type: StatsType, _uid: i32, level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::ScreenOn => Some(&mut self.on_timer),
            StatsType::ScreenBrightness => {
                if level < 0 {
                    warn!("negative brightness level {}", level);
                    return None;
                }
                Some(self.brightness.get_or_create(i32::from(level)))
            }
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, _uid: i32, level: i16) -> i64 {
        match stats_type {
            StatsType::ScreenOn => self.on_timer.running_time_ms(),
            StatsType::ScreenBrightness if level >= 0 => self.brightness.time_ms(i32::from(level)),
            // no level: time at any brightness
            StatsType::ScreenBrightness => self
                .brightness
                .keys()
                .into_iter()
                .map(|l| self.brightness.time_ms(l))
                .sum(),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power_mah = 0.0;
        self.on_timer.reset();
        self.brightness.reset_all();
    }

    fn dump(&mut self, out: &mut String) {
        let on_ms = self.on_timer.running_time_ms();
        let _ = writeln!(out, "Screen on time: {}ms", on_ms);
        for level in self.brightness.keys() {
            let ms = self.brightness.time_ms(level);
            let _ = writeln!(out, "Screen brightness level {} time: {}ms", level, ms);
        }
        let _ = writeln!(out, "Screen power: {:.6}mAh", self.power_mah);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_power_scales_with_brightness() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"screen_on": 36, "screen_brightness": 1.8}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut screen = ScreenEntity::new(tb);
        screen.timer(StatsType::ScreenOn, -1, -1).unwrap().start_running();
        screen.timer(StatsType::ScreenBrightness, -1, 0)
            .unwrap()
            .start_running();
        clock.advance(100_000);
        screen.timer(StatsType::ScreenBrightness, -1, 0)
            .unwrap()
            .stop_running();
        screen.timer(StatsType::ScreenBrightness, -1, 100)
            .unwrap()
            .start_running();
        clock.advance(100_000);

        // level 0: 36 mA; level 100: 1.8 * 100 + 36 = 216 mA
        let row = screen.calculate(-1, &env).unwrap();
        assert!(approx(row.power_mah, 1.0 + 6.0));
        assert_eq!(screen.active_time_ms(StatsType::ScreenOn, -1, -1), 200_000);
        assert_eq!(screen.active_time_ms(StatsType::ScreenBrightness, -1, 100), 100_000);
        assert!(screen.timer(StatsType::ScreenBrightness, -1, -1).is_none());
    }
}
