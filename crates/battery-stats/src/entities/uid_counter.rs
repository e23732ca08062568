use super::{CalcEnv, CounterMap, PowerMap, StatsEntity};
use crate::accumulator::Counter;
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// An app-attributed component charged a fixed cost per event.
#[derive(Debug)]
pub struct UidCounterEntity {
    consumption_type: ConsumptionType,
    stats_type: StatsType,
    key: &'static str,
    counters: CounterMap,
    power: PowerMap,
}

impl UidCounterEntity {
    /// Alarm wakeups, `alarm_on` mAh per trigger.
    pub fn alarm() -> Self {
        Self {
            consumption_type: ConsumptionType::Alarm,
            stats_type: StatsType::Alarm,
            key: keys::ALARM_ON,
            counters: CounterMap::default(),
            power: PowerMap::default(),
        }
    }

    fn power_for(&self, uid: i32, env: &CalcEnv<'_>) -> f64 {
        env.table.average_power_ma(self.key) * self.counters.count(uid) as f64
    }
}

impl StatsEntity for UidCounterEntity {
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

    fn counter(&mut self, stats_type: StatsType, uid: i32) -> Option<&mut Counter> {
        if stats_type != self.stats_type {
            return None;
        }
        Some(self.counters.get_or_create(uid))
    }

    fn traffic_bytes(&self, stats_type: StatsType, uid: i32) -> i64 {
        // event count, reported through the data query
        if stats_type != self.stats_type {
            return 0;
        }
        self.counters.count(uid)
    }

    fn reset(&mut self) {
        self.power.zero_all();
        self.counters.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[test]
    fn test_alarm_power_per_trigger() {
        let t = table(r#"{"alarm_on": 0.25}"#);
        let env = CalcEnv {
            table: &t,
            cpu: &NoCpu,
        };
        let mut alarm = UidCounterEntity::alarm();
        for _ in 0..4 {
            alarm.counter(StatsType::Alarm, 10_000).unwrap().add_count(1);
        }
        alarm.calculate(10_000, &env);
        assert_eq!(alarm.entity_power_mah(10_000), 1.0);
        assert_eq!(alarm.traffic_bytes(StatsType::Alarm, 10_000), 4);
        assert!(alarm.counter(StatsType::WifiScan, 10_000).is_none());

        alarm.reset();
        assert_eq!(alarm.stats_power_mah(StatsType::Alarm, 10_000, &env), 0.0);
    }
}
