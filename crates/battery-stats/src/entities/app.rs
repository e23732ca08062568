use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::types::{user_id_of, StatsInfo, INVALID_VALUE};

/// Registry of known uids and their rolled-up power.
///
/// A uid becomes known the first time any event or CPU reading names it;
/// the aggregation core fills in the power on every recomputation.
#[derive(Debug, Default)]
pub struct AppEntity {
    power: BTreeMap<i32, f64>,
}

impl AppEntity {
    /// Register `uid`. Returns true when it was not known before.
    pub fn update_uid_map(&mut self, uid: i32) -> bool {
        if uid <= INVALID_VALUE || self.power.contains_key(&uid) {
            return false;
        }
        self.power.insert(uid, 0.0);
        true
    }

    pub fn uids(&self) -> Vec<i32> {
        self.power.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    pub fn set_power(&mut self, uid: i32, mah: f64) {
        self.power.insert(uid, mah);
    }

    pub fn entity_power_mah(&self, uid: i32) -> f64 {
        self.power.get(&uid).copied().unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        for v in self.power.values_mut() {
            *v = 0.0;
        }
    }

    pub fn dump(&self, out: &mut String) {
        let _ = writeln!(out, "Known uids: {}", self.power.len());
        for (uid, mah) in &self.power {
            let _ = writeln!(out, "uid {} power: {:.6}mAh", uid, mah);
        }
    }
}

/// Power per user, summed from that user's apps.
#[derive(Debug, Default)]
pub struct UserEntity {
    power: BTreeMap<i32, f64>,
}

impl UserEntity {
    pub fn aggregate_user_power_mah(&mut self, uid: i32, mah: f64) {
        *self.power.entry(user_id_of(uid)).or_insert(0.0) += mah;
    }

    pub fn entity_power_mah(&self, user_id: i32) -> f64 {
        self.power.get(&user_id).copied().unwrap_or(0.0)
    }

    /// One USER row per user id, in user id order.
    pub fn rows(&self) -> Vec<StatsInfo> {
        self.power
            .iter()
            .map(|(user_id, mah)| StatsInfo::user(*user_id, *mah))
            .collect()
    }

    pub fn reset(&mut self) {
        for v in self.power.values_mut() {
            *v = 0.0;
        }
    }
}
