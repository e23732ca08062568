use std::sync::Arc;

use super::{mah, CalcEnv, PowerMap, StatsEntity, TimerMap};
use crate::accumulator::ActiveTimer;
use crate::time_base::TimeBase;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Gravity and proximity sensor use per app.
#[derive(Debug)]
pub struct SensorEntity {
    gravity: TimerMap,
    proximity: TimerMap,
    power: PowerMap,
}

impl SensorEntity {
    pub fn new(base: Arc<TimeBase>) -> Self {
        Self {
            gravity: TimerMap::new(base.clone()),
            proximity: TimerMap::new(base),
            power: PowerMap::default(),
        }
    }

    fn part_power(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::SensorGravityOn => mah(
                env.table.average_power_ma(keys::SENSOR_GRAVITY),
                self.gravity.time_ms(uid),
            ),
            StatsType::SensorProximityOn => mah(
                env.table.average_power_ma(keys::SENSOR_PROXIMITY),
                self.proximity.time_ms(uid),
            ),
            _ => 0.0,
        }
    }
}

impl StatsEntity for SensorEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Sensor
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid <= INVALID_VALUE {
            return None;
        }
        let power = self.part_power(StatsType::SensorGravityOn, uid, env)
            + self.part_power(StatsType::SensorProximityOn, uid, env);
        self.power.set(uid, power);
        None
    }

    fn entity_power_mah(&self, uid: i32) -> f64 {
        self.power.get(uid)
    }

    fn stats_power_mah(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        self.part_power(stats_type, uid, env)
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> Option<&mut ActiveTimer> {
        match stats_type {
            StatsType::SensorGravityOn => Some(self.gravity.get_or_create(uid)),
            StatsType::SensorProximityOn => Some(self.proximity.get_or_create(uid)),
            _ => None,
        }
    }

    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::SensorGravityOn => self.gravity.time_ms(uid),
            StatsType::SensorProximityOn => self.proximity.time_ms(uid),
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.power.zero_all();
        self.gravity.reset_all();
        self.proximity.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_gravity_and_proximity_add_up() {
        let (clock, tb) = on_battery();
        let t = table(r#"{"sensor_gravity_on": 36, "sensor_proximity_on": 72}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut sensor = SensorEntity::new(tb);
        sensor.timer(StatsType::SensorGravityOn, 10_000, -1)
            .unwrap()
            .start_running();
        sensor.timer(StatsType::SensorProximityOn, 10_000, -1)
            .unwrap()
            .start_running();
        clock.advance(100_000);
        sensor.calculate(10_000, &env);
        assert!(approx(sensor.entity_power_mah(10_000), 3.0));
        assert!(approx(
            sensor.stats_power_mah(StatsType::SensorProximityOn, 10_000, &env),
            2.0
        ));
        assert!(sensor.calculate(-1, &env).is_none());
    }
}
