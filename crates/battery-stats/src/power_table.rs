//! Average current table (`power_average.json`).
//!
//! The file is a flat JSON object. Each value is either a number (a single
//! average current in mA) or an array of numbers indexed by level, such as
//! brightness or signal bucket. CPU layout is inferred from `cpu_clusters`
//! and the `cpu_speed_cluster<N>` arrays.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::error::{io_error, Error, Result};
use crate::types::keys;
use crate::FsProvider;

pub const VENDOR_POWER_AVERAGE_FILE: &str = "/vendor/etc/profile/power_average.json";
pub const SYSTEM_POWER_AVERAGE_FILE: &str = "/system/etc/profile/power_average.json";
/// Relative location of the table inside a config policy layer.
pub const POLICY_POWER_AVERAGE_SUFFIX: &str = "etc/profile/power_average.json";
/// Config policy layers, highest priority first.
pub const DEFAULT_POLICY_LAYERS: &[&str] = &["/sys_prod", "/chip_prod"];

#[derive(Clone, Debug, Default)]
pub struct AveragePowerTable {
    scalars: HashMap<String, f64>,
    levels: HashMap<String, Vec<f64>>,
    cluster_num: usize,
    speed_nums: BTreeMap<usize, usize>,
}

impl AveragePowerTable {
    /// Try `paths` in order and return the first table that loads, with the
    /// path it came from.
    pub fn init<P: FsProvider>(fs: &P, paths: &[PathBuf]) -> Result<(Self, PathBuf)> {
        for path in paths {
            match Self::load(fs, path) {
                Ok(table) => {
                    info!(
                        "loaded average power table from {} ({} entries)",
                        path.display(),
                        table.len()
                    );
                    return Ok((table, path.clone()));
                }
                Err(e) => debug!("skipping power table candidate: {}", e),
            }
        }
        Err(Error::NoPowerTable {
            tried: paths.to_vec(),
        })
    }

    pub fn load<P: FsProvider>(fs: &P, path: &Path) -> Result<Self> {
        let text = fs.read_to_string(path).map_err(|e| io_error(path, e))?;
        Self::from_json_str(&text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a table. Only a non-object document is an error; entries of
    /// the wrong shape are skipped.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        let root: Map<String, Value> = serde_json::from_str(text)?;
        let mut table = Self::default();
        for (key, value) in root {
            match value {
                Value::Number(n) => match n.as_f64() {
                    Some(v) => {
                        table.scalars.insert(key, v);
                    }
                    None => warn!("skipping {}: not representable as f64", key),
                },
                Value::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_f64() {
                            Some(v) => list.push(v),
                            None => warn!("skipping non-numeric level in {}: {}", key, item),
                        }
                    }
                    table.note_cpu_layout(&key, list.len());
                    table.levels.insert(key, list);
                }
                other => warn!("skipping {}: unsupported value {}", key, other),
            }
        }
        Ok(table)
    }

    fn note_cpu_layout(&mut self, key: &str, len: usize) {
        if key == keys::CPU_CLUSTER {
            self.cluster_num = len;
        } else if let Some(idx) = key.strip_prefix(keys::CPU_SPEED) {
            match idx.parse::<usize>() {
                Ok(cluster) => {
                    self.speed_nums.insert(cluster, len);
                }
                Err(_) => warn!("ignoring cpu speed key without cluster index: {}", key),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.scalars.len() + self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar average current in mA, 0 when absent.
    pub fn average_power_ma(&self, key: &str) -> f64 {
        self.scalars.get(key).copied().unwrap_or(0.0)
    }

    /// Per-level average current in mA, 0 when absent or out of range.
    pub fn average_power_ma_at(&self, key: &str, level: i32) -> f64 {
        if level < 0 {
            return 0.0;
        }
        self.levels
            .get(key)
            .and_then(|v| v.get(level as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn cluster_num(&self) -> usize {
        self.cluster_num
    }

    /// Number of frequency steps for `cluster`, 0 when unknown.
    pub fn speed_num(&self, cluster: usize) -> usize {
        self.speed_nums.get(&cluster).copied().unwrap_or(0)
    }
}

/// Default candidate list: vendor override first, then the system copy.
/// The policy-resolved path is appended at init, see [`table_candidates`].
pub fn default_table_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from(VENDOR_POWER_AVERAGE_FILE),
        PathBuf::from(SYSTEM_POWER_AVERAGE_FILE),
    ]
}

pub fn default_policy_layers() -> Vec<PathBuf> {
    DEFAULT_POLICY_LAYERS.iter().map(PathBuf::from).collect()
}

/// First policy layer that carries a power table.
pub fn resolve_policy_table<P: FsProvider>(fs: &P, layers: &[PathBuf]) -> Option<PathBuf> {
    layers
        .iter()
        .map(|layer| layer.join(POLICY_POWER_AVERAGE_SUFFIX))
        .find(|path| fs.exists(path))
}

/// `paths` followed by the policy-resolved table, when one exists and is
/// not already listed.
pub fn table_candidates<P: FsProvider>(
    fs: &P,
    paths: &[PathBuf],
    layers: &[PathBuf],
) -> Vec<PathBuf> {
    let mut candidates = paths.to_vec();
    match resolve_policy_table(fs, layers) {
        Some(policy) if !candidates.contains(&policy) => {
            debug!("policy power table candidate {}", policy.display());
            candidates.push(policy);
        }
        Some(_) => {}
        None => debug!("no power table in {} policy layers", layers.len()),
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_fs::MockFs;

    const SAMPLE: &str = r#"{
        "bluetooth_on": 1.5,
        "radio_on": [10, 20, 30, 40, 50],
        "cpu_clusters": [2.0, 4.0],
        "cpu_speed_cluster0": [1, 2, 3],
        "cpu_speed_cluster1": [5, 6],
        "screen_on": "bright",
        "wifi_rx": [1, "x", 3]
    }"#;

    #[test]
    fn test_lookup_scalar_and_levels() {
        let t = AveragePowerTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(t.average_power_ma("bluetooth_on"), 1.5);
        assert_eq!(t.average_power_ma("missing"), 0.0);
        assert_eq!(t.average_power_ma_at("radio_on", 2), 30.0);
        assert_eq!(t.average_power_ma_at("radio_on", 5), 0.0);
        assert_eq!(t.average_power_ma_at("radio_on", -1), 0.0);
        // a scalar key is not an array
        assert_eq!(t.average_power_ma_at("bluetooth_on", 0), 0.0);
    }

    #[test]
    fn test_cpu_layout() {
        let t = AveragePowerTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(t.cluster_num(), 2);
        assert_eq!(t.speed_num(0), 3);
        assert_eq!(t.speed_num(1), 2);
        assert_eq!(t.speed_num(7), 0);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let t = AveragePowerTable::from_json_str(SAMPLE).unwrap();
        assert_eq!(t.average_power_ma("screen_on"), 0.0);
        assert_eq!(t.average_power_ma_at("wifi_rx", 1), 3.0);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(AveragePowerTable::from_json_str("[1, 2]").is_err());
        assert!(AveragePowerTable::from_json_str("{").is_err());
    }

    #[test]
    fn test_init_falls_back_through_candidates() {
        let fs = MockFs::new();
        let vendor = PathBuf::from(VENDOR_POWER_AVERAGE_FILE);
        let system = PathBuf::from(SYSTEM_POWER_AVERAGE_FILE);
        fs.add_file(&vendor, "not json");
        fs.add_file(&system, r#"{"wifi_on": 3}"#);
        let (t, from) = AveragePowerTable::init(&fs, &default_table_paths()).unwrap();
        assert_eq!(from, system);
        assert_eq!(t.average_power_ma("wifi_on"), 3.0);
    }

    #[test]
    fn test_init_prefers_vendor_table() {
        let fs = MockFs::new();
        let vendor = PathBuf::from(VENDOR_POWER_AVERAGE_FILE);
        let system = PathBuf::from(SYSTEM_POWER_AVERAGE_FILE);
        fs.add_file(&vendor, r#"{"wifi_on": 4}"#);
        fs.add_file(&system, r#"{"wifi_on": 3}"#);
        let (t, from) = AveragePowerTable::init(&fs, &default_table_paths()).unwrap();
        assert_eq!(from, vendor);
        assert_eq!(t.average_power_ma("wifi_on"), 4.0);
        assert_eq!(fs.read_count(&system), 0);
    }

    #[test]
    fn test_init_fails_when_nothing_usable() {
        let fs = MockFs::new();
        fs.set_no_perm_file(Path::new(VENDOR_POWER_AVERAGE_FILE));
        let err = AveragePowerTable::init(&fs, &default_table_paths()).unwrap_err();
        match err {
            Error::NoPowerTable { tried } => assert_eq!(tried.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_policy_layer_order() {
        let fs = MockFs::new();
        let layers = default_policy_layers();
        assert_eq!(resolve_policy_table(&fs, &layers), None);

        let chip = PathBuf::from("/chip_prod/etc/profile/power_average.json");
        fs.add_file(&chip, "{}");
        assert_eq!(resolve_policy_table(&fs, &layers), Some(chip.clone()));

        let sys = PathBuf::from("/sys_prod/etc/profile/power_average.json");
        fs.add_file(&sys, "{}");
        assert_eq!(resolve_policy_table(&fs, &layers), Some(sys));
    }

    #[test]
    fn test_init_falls_back_to_policy_table() {
        let fs = MockFs::new();
        let policy = PathBuf::from("/chip_prod/etc/profile/power_average.json");
        fs.add_file(&policy, r#"{"wifi_on": 7}"#);
        let candidates = table_candidates(&fs, &default_table_paths(), &default_policy_layers());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2], policy);

        let (t, from) = AveragePowerTable::init(&fs, &candidates).unwrap();
        assert_eq!(from, policy);
        assert_eq!(t.average_power_ma("wifi_on"), 7.0);
    }

    #[test]
    fn test_policy_candidate_not_duplicated() {
        let fs = MockFs::new();
        let policy = PathBuf::from("/sys_prod/etc/profile/power_average.json");
        fs.add_file(&policy, "{}");
        let candidates = table_candidates(&fs, &[policy.clone()], &default_policy_layers());
        assert_eq!(candidates, vec![policy]);
    }

    #[test]
    fn test_load_reports_permission() {
        let fs = MockFs::new();
        let p = PathBuf::from("/etc/power.json");
        fs.add_file(&p, "{}");
        fs.set_no_perm_file(&p);
        match AveragePowerTable::load(&fs, &p) {
            Err(Error::NoPermission { path, .. }) => assert_eq!(path, p),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
