use std::collections::BTreeMap;

use log::debug;

use super::{mah, CalcEnv, PowerMap, StatsEntity};
use crate::types::{keys, ConsumptionType, StatsInfo, StatsType, INVALID_VALUE};

/// Per-app CPU power from the times the CPU reader has credited.
///
/// Has no hardware row: device-wide CPU draw outside apps is covered by
/// the idle entity.
#[derive(Debug, Default)]
pub struct CpuEntity {
    total: PowerMap,
    active: PowerMap,
    cluster: PowerMap,
    speed: PowerMap,
    cpu_time_ms: BTreeMap<i32, i64>,
}

impl CpuEntity {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_power(uid: i32, env: &CalcEnv<'_>) -> f64 {
        mah(
            env.table.average_power_ma(keys::CPU_ACTIVE),
            env.cpu.uid_active_time_ms(uid),
        )
    }

    fn cluster_power(uid: i32, env: &CalcEnv<'_>) -> f64 {
        (0..env.table.cluster_num())
            .map(|c| {
                mah(
                    env.table.average_power_ma_at(keys::CPU_CLUSTER, c as i32),
                    env.cpu.uid_cluster_time_ms(uid, c),
                )
            })
            .sum()
    }

    fn speed_power(uid: i32, env: &CalcEnv<'_>) -> f64 {
        let mut power = 0.0;
        for cluster in 0..env.table.cluster_num() {
            let key = format!("{}{}", keys::CPU_SPEED, cluster);
            for speed in 0..env.table.speed_num(cluster) {
                power += mah(
                    env.table.average_power_ma_at(&key, speed as i32),
                    env.cpu.uid_freq_time_ms(uid, cluster, speed),
                );
            }
        }
        power
    }
}

impl StatsEntity for CpuEntity {
    fn consumption_type(&self) -> ConsumptionType {
        ConsumptionType::Cpu
    }

    fn calculate(&mut self, uid: i32, env: &CalcEnv<'_>) -> Option<StatsInfo> {
        if uid <= INVALID_VALUE {
            return None;
        }
        let active = Self::active_power(uid, env);
        let cluster = Self::cluster_power(uid, env);
        let speed = Self::speed_power(uid, env);
        self.active.set(uid, active);
        self.cluster.set(uid, cluster);
        self.speed.set(uid, speed);
        self.total.set(uid, active + cluster + speed);

        let [user_ms, system_ms] = env.cpu.uid_cpu_time_ms(uid);
        self.cpu_time_ms.insert(uid, user_ms + system_ms);
        debug!(
            "uid {} cpu power {:.6}mAh (active {:.6}, cluster {:.6}, speed {:.6})",
            uid,
            active + cluster + speed,
            active,
            cluster,
            speed
        );
        None
    }

    fn entity_power_mah(&self, uid: i32) -> f64 {
        self.total.get(uid)
    }

    fn stats_power_mah(&mut self, stats_type: StatsType, uid: i32, env: &CalcEnv<'_>) -> f64 {
        match stats_type {
            StatsType::CpuActive => Self::active_power(uid, env),
            StatsType::CpuCluster => Self::cluster_power(uid, env),
            StatsType::CpuSpeed => Self::speed_power(uid, env),
            _ => 0.0,
        }
    }

    /// User plus system time observed at the last `calculate` for `uid`.
    fn active_time_ms(&mut self, stats_type: StatsType, uid: i32, _level: i16) -> i64 {
        match stats_type {
            StatsType::CpuActive | StatsType::CpuCluster | StatsType::CpuSpeed => {
                self.cpu_time_ms.get(&uid).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    fn reset(&mut self) {
        self.total.zero_all();
        self.active.zero_all();
        self.cluster.zero_all();
        self.speed.zero_all();
        for v in self.cpu_time_ms.values_mut() {
            *v = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::table;
    use super::*;
    use crate::cpu_time_reader::CpuTimeSource;

    struct FixedCpu;

    impl CpuTimeSource for FixedCpu {
        fn uid_active_time_ms(&self, uid: i32) -> i64 {
            if uid == 10_000 {
                3_600_000
            } else {
                0
            }
        }
        fn uid_cluster_time_ms(&self, uid: i32, cluster: usize) -> i64 {
            if uid == 10_000 {
                [360_000, 720_000][cluster]
            } else {
                0
            }
        }
        fn uid_freq_time_ms(&self, uid: i32, cluster: usize, speed: usize) -> i64 {
            if uid == 10_000 && cluster == 1 && speed == 1 {
                1_800_000
            } else {
                0
            }
        }
        fn uid_cpu_time_ms(&self, uid: i32) -> [i64; 2] {
            if uid == 10_000 {
                [700, 300]
            } else {
                [0, 0]
            }
        }
    }

    const TABLE: &str = r#"{
        "cpu_active": 10,
        "cpu_clusters": [10, 5],
        "cpu_speed_cluster0": [1, 2],
        "cpu_speed_cluster1": [3, 4]
    }"#;

    #[test]
    fn test_active_cluster_and_speed_components() {
        let t = table(TABLE);
        let env = CalcEnv {
            table: &t,
            cpu: &FixedCpu,
        };
        let mut cpu = CpuEntity::new();
        assert!(cpu.calculate(10_000, &env).is_none());

        // active 10 mAh, clusters 1 + 1, speed 4 mA for half an hour
        assert_eq!(cpu.stats_power_mah(StatsType::CpuActive, 10_000, &env), 10.0);
        assert_eq!(cpu.stats_power_mah(StatsType::CpuCluster, 10_000, &env), 2.0);
        assert_eq!(cpu.stats_power_mah(StatsType::CpuSpeed, 10_000, &env), 2.0);
        assert_eq!(cpu.entity_power_mah(10_000), 14.0);
        assert_eq!(cpu.active_time_ms(StatsType::CpuActive, 10_000, -1), 1_000);
    }

    #[test]
    fn test_no_hardware_row_and_unknown_uid() {
        let t = table(TABLE);
        let env = CalcEnv {
            table: &t,
            cpu: &FixedCpu,
        };
        let mut cpu = CpuEntity::new();
        assert!(cpu.calculate(-1, &env).is_none());
        cpu.calculate(10_001, &env);
        assert_eq!(cpu.entity_power_mah(10_001), 0.0);
        assert_eq!(cpu.entity_power_mah(42), 0.0);
    }
}
