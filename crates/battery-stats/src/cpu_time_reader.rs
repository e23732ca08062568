//! Per-uid CPU time from the kernel's cumulative proc counters.
//!
//! Each source file holds ever-growing totals per uid. The reader keeps the
//! last value it accepted for every uid and credits only the increment,
//! and only while the device is on battery. An increment that would be
//! negative means the counter was reset underneath us; that line is
//! rejected and its previous value kept.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::PathBuf;

use log::{debug, warn};

use crate::error::io_error;
use crate::power_table::AveragePowerTable;
use crate::types::US_IN_MS;
use crate::{FsProvider, RealFs};

pub const ACTIVE_TIME_FILE: &str = "uid_concurrent_active_time";
pub const CLUSTER_TIME_FILE: &str = "uid_concurrent_policy_time";
pub const FREQ_TIME_FILE: &str = "uid_time_in_state";
pub const UID_TIME_FILE: &str = "uid_cputime/show_uid_stat";

// Raw concurrent/freq values are in 10ms ticks
const TICK_MS: i64 = 10;

#[derive(Clone, Debug)]
pub struct CpuTimeReaderConfig {
    pub proc_root: PathBuf,
}

impl Default for CpuTimeReaderConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

/// Conditions that decide how a refresh is credited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimeGate {
    pub on_battery: bool,
    pub wakelock_held: bool,
}

impl CpuTimeGate {
    // Half of a uid's increment is withheld while any wakelock is held.
    fn weigh(&self, delta: i64) -> i64 {
        if self.wakelock_held {
            delta / 2
        } else {
            delta
        }
    }
}

/// Outcome of one refresh: whether every source was accepted, and every
/// uid that appeared in any source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CpuTimeUpdate {
    pub success: bool,
    pub uids: BTreeSet<i32>,
}

/// Read access to accumulated per-uid CPU time.
pub trait CpuTimeSource {
    fn uid_active_time_ms(&self, uid: i32) -> i64;
    fn uid_cluster_time_ms(&self, uid: i32, cluster: usize) -> i64;
    fn uid_freq_time_ms(&self, uid: i32, cluster: usize, speed: usize) -> i64;
    /// `[user, system]` milliseconds.
    fn uid_cpu_time_ms(&self, uid: i32) -> [i64; 2];
}

#[derive(Debug, Default)]
struct Shadow {
    last: HashMap<i32, Vec<i64>>,
}

impl Shadow {
    /// Increments of `current` over the last accepted values for `uid`, or
    /// None if any bucket went backwards. Unseen buckets start at zero.
    fn accept(&mut self, uid: i32, current: Vec<i64>) -> Option<Vec<i64>> {
        let deltas: Vec<i64> = {
            let last = self.last.get(&uid);
            current
                .iter()
                .enumerate()
                .map(|(i, v)| v - last.and_then(|l| l.get(i)).copied().unwrap_or(0))
                .collect()
        };
        if deltas.iter().any(|d| *d < 0) {
            return None;
        }
        self.last.insert(uid, current);
        Some(deltas)
    }

    fn retain(&mut self, seen: &BTreeSet<i32>) {
        self.last.retain(|uid, _| seen.contains(uid));
    }

    fn len(&self) -> usize {
        self.last.len()
    }
}

pub struct CpuTimeReader<P: FsProvider = RealFs> {
    fs: P,
    cfg: CpuTimeReaderConfig,
    active_shadow: Shadow,
    cluster_shadow: Shadow,
    freq_shadow: Shadow,
    uid_time_shadow: Shadow,
    active_ms: HashMap<i32, i64>,
    cluster_ms: HashMap<i32, Vec<i64>>,
    freq_ms: HashMap<i32, Vec<Vec<i64>>>,
    uid_time_us: HashMap<i32, [i64; 2]>,
}

impl Default for CpuTimeReader<RealFs> {
    fn default() -> Self {
        Self::new(CpuTimeReaderConfig::default())
    }
}

impl CpuTimeReader<RealFs> {
    pub fn new(cfg: CpuTimeReaderConfig) -> Self {
        Self::with_provider(RealFs, cfg)
    }
}

impl<P: FsProvider> CpuTimeReader<P> {
    pub fn with_provider(fs: P, cfg: CpuTimeReaderConfig) -> Self {
        Self {
            fs,
            cfg,
            active_shadow: Shadow::default(),
            cluster_shadow: Shadow::default(),
            freq_shadow: Shadow::default(),
            uid_time_shadow: Shadow::default(),
            active_ms: HashMap::new(),
            cluster_ms: HashMap::new(),
            freq_ms: HashMap::new(),
            uid_time_us: HashMap::new(),
        }
    }

    /// Refresh from all four sources in turn. A failing source does not stop
    /// the others.
    pub fn update_cpu_time(&mut self, table: &AveragePowerTable, gate: CpuTimeGate) -> CpuTimeUpdate {
        let mut uids = BTreeSet::new();
        let active = self.read_uid_active_time(gate, &mut uids);
        let cluster = self.read_uid_cluster_time(gate, &mut uids);
        let freq = self.read_uid_freq_time(table, gate, &mut uids);
        let generic = self.read_uid_time(gate, &mut uids);
        if !(active && cluster && freq && generic) {
            debug!(
                "cpu time refresh incomplete: active={} cluster={} freq={} uid_time={}",
                active, cluster, freq, generic
            );
        }
        CpuTimeUpdate {
            success: active && cluster && freq && generic,
            uids,
        }
    }

    fn read_source(&self, file: &str) -> Option<String> {
        let path = self.cfg.proc_root.join(file);
        match self.fs.read_to_string(&path) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("{}", io_error(&path, e));
                None
            }
        }
    }

    /// `cpus: N` header, then `uid: t0 t1 ...` where the sum is the uid's
    /// concurrent active time.
    pub fn read_uid_active_time(&mut self, gate: CpuTimeGate, uids: &mut BTreeSet<i32>) -> bool {
        let Some(text) = self.read_source(ACTIVE_TIME_FILE) else {
            return false;
        };
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for line in text.lines().filter(|l| !l.trim().is_empty() && !l.starts_with("cpus")) {
            let Some((uid, values)) = parse_uid_line(line) else {
                debug!("malformed {} line: {:?}", ACTIVE_TIME_FILE, line);
                ok = false;
                continue;
            };
            uids.insert(uid);
            seen.insert(uid);
            let total = values.iter().sum::<i64>() * TICK_MS;
            match self.active_shadow.accept(uid, vec![total]) {
                Some(delta) => {
                    if gate.on_battery && delta[0] > 0 {
                        *self.active_ms.entry(uid).or_default() += delta[0];
                    }
                }
                None => {
                    debug!("{}: counter went backwards for uid {}", ACTIVE_TIME_FILE, uid);
                    ok = false;
                }
            }
        }
        if ok {
            self.active_shadow.retain(&seen);
        }
        ok
    }

    /// `policy0: 4 policy4: 4 ...` header giving the core count of each
    /// cluster, then one value per core on each uid line.
    pub fn read_uid_cluster_time(&mut self, gate: CpuTimeGate, uids: &mut BTreeSet<i32>) -> bool {
        let Some(text) = self.read_source(CLUSTER_TIME_FILE) else {
            return false;
        };
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let Some(cores) = lines.next().and_then(parse_policy_header) else {
            warn!("{}: missing or malformed policy header", CLUSTER_TIME_FILE);
            return false;
        };
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for line in lines {
            let Some((uid, values)) = parse_uid_line(line) else {
                debug!("malformed {} line: {:?}", CLUSTER_TIME_FILE, line);
                ok = false;
                continue;
            };
            uids.insert(uid);
            seen.insert(uid);
            let Some(per_cluster) = sum_by_cluster(&values, &cores) else {
                debug!("{}: uid {} has fewer values than cores", CLUSTER_TIME_FILE, uid);
                ok = false;
                continue;
            };
            match self.cluster_shadow.accept(uid, per_cluster) {
                Some(deltas) => {
                    if gate.on_battery {
                        let totals = self.cluster_ms.entry(uid).or_default();
                        if totals.len() < deltas.len() {
                            totals.resize(deltas.len(), 0);
                        }
                        for (t, d) in totals.iter_mut().zip(deltas) {
                            *t += gate.weigh(d);
                        }
                    }
                }
                None => {
                    debug!("{}: counter went backwards for uid {}", CLUSTER_TIME_FILE, uid);
                    ok = false;
                }
            }
        }
        if ok {
            self.cluster_shadow.retain(&seen);
        }
        ok
    }

    /// `uid: f0 f1 ...` header, then per-frequency ticks laid out cluster by
    /// cluster as described by the power table's speed counts.
    pub fn read_uid_freq_time(
        &mut self,
        table: &AveragePowerTable,
        gate: CpuTimeGate,
        uids: &mut BTreeSet<i32>,
    ) -> bool {
        let Some(text) = self.read_source(FREQ_TIME_FILE) else {
            return false;
        };
        let speeds: Vec<usize> = (0..table.cluster_num()).map(|c| table.speed_num(c)).collect();
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for line in text.lines().filter(|l| !l.trim().is_empty() && !l.starts_with("uid")) {
            let Some((uid, values)) = parse_uid_line(line) else {
                debug!("malformed {} line: {:?}", FREQ_TIME_FILE, line);
                ok = false;
                continue;
            };
            uids.insert(uid);
            seen.insert(uid);
            let cumulative: Vec<i64> = values.iter().map(|v| v * TICK_MS).collect();
            match self.freq_shadow.accept(uid, cumulative) {
                Some(deltas) => {
                    if gate.on_battery {
                        let totals = self.freq_ms.entry(uid).or_default();
                        credit_by_speed(totals, &deltas, &speeds, gate);
                    }
                }
                None => {
                    debug!("{}: counter went backwards for uid {}", FREQ_TIME_FILE, uid);
                    ok = false;
                }
            }
        }
        if ok {
            self.freq_shadow.retain(&seen);
        }
        ok
    }

    /// `uid: user_us system_us`.
    pub fn read_uid_time(&mut self, gate: CpuTimeGate, uids: &mut BTreeSet<i32>) -> bool {
        let Some(text) = self.read_source(UID_TIME_FILE) else {
            return false;
        };
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let parsed = parse_uid_line(line).filter(|(_, v)| v.len() >= 2);
            let Some((uid, values)) = parsed else {
                debug!("malformed {} line: {:?}", UID_TIME_FILE, line);
                ok = false;
                continue;
            };
            uids.insert(uid);
            seen.insert(uid);
            match self.uid_time_shadow.accept(uid, values[..2].to_vec()) {
                Some(deltas) => {
                    if gate.on_battery {
                        let totals = self.uid_time_us.entry(uid).or_default();
                        totals[0] += gate.weigh(deltas[0]);
                        totals[1] += gate.weigh(deltas[1]);
                    }
                }
                None => {
                    debug!("{}: counter went backwards for uid {}", UID_TIME_FILE, uid);
                    ok = false;
                }
            }
        }
        if ok {
            self.uid_time_shadow.retain(&seen);
        }
        ok
    }

    /// Zero the credited totals. Last-seen values are kept so the next
    /// refresh only credits new time.
    pub fn reset(&mut self) {
        self.active_ms.clear();
        self.cluster_ms.clear();
        self.freq_ms.clear();
        self.uid_time_us.clear();
    }

    /// Number of uids tracked per source, for health logging.
    pub fn tracked_uids(&self) -> [usize; 4] {
        [
            self.active_shadow.len(),
            self.cluster_shadow.len(),
            self.freq_shadow.len(),
            self.uid_time_shadow.len(),
        ]
    }

    pub fn dump(&self, out: &mut String, uid: i32) {
        let [user, system] = self.uid_cpu_time_ms(uid);
        let _ = writeln!(
            out,
            "Total cpu time: userSpaceTime={}ms, systemSpaceTime={}ms",
            user, system
        );
        out.push_str("Total cpu time per freq: ");
        if let Some(clusters) = self.freq_ms.get(&uid) {
            for (i, speeds) in clusters.iter().enumerate() {
                let _ = write!(out, "cluster{}={:?} ", i, speeds);
            }
        }
        out.push('\n');
        let _ = writeln!(out, "Cpu active time: {}ms", self.uid_active_time_ms(uid));
    }
}

impl<P: FsProvider> CpuTimeSource for CpuTimeReader<P> {
    fn uid_active_time_ms(&self, uid: i32) -> i64 {
        self.active_ms.get(&uid).copied().unwrap_or(0)
    }

    fn uid_cluster_time_ms(&self, uid: i32, cluster: usize) -> i64 {
        self.cluster_ms
            .get(&uid)
            .and_then(|v| v.get(cluster))
            .copied()
            .unwrap_or(0)
    }

    fn uid_freq_time_ms(&self, uid: i32, cluster: usize, speed: usize) -> i64 {
        self.freq_ms
            .get(&uid)
            .and_then(|c| c.get(cluster))
            .and_then(|s| s.get(speed))
            .copied()
            .unwrap_or(0)
    }

    fn uid_cpu_time_ms(&self, uid: i32) -> [i64; 2] {
        match self.uid_time_us.get(&uid) {
            Some([user, system]) => [user / US_IN_MS, system / US_IN_MS],
            None => [0, 0],
        }
    }
}

fn parse_uid_line(line: &str) -> Option<(i32, Vec<i64>)> {
    let (uid, rest) = line.split_once(':')?;
    let uid = uid.trim().parse::<i32>().ok()?;
    let values = rest
        .split_whitespace()
        .map(|v| v.parse::<i64>().ok())
        .collect::<Option<Vec<i64>>>()?;
    Some((uid, values))
}

fn parse_policy_header(line: &str) -> Option<Vec<usize>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 2 != 0 || !tokens[0].starts_with("policy") {
        return None;
    }
    tokens.chunks(2).map(|pair| pair[1].parse::<usize>().ok()).collect()
}

fn sum_by_cluster(values: &[i64], cores: &[usize]) -> Option<Vec<i64>> {
    let mut out = Vec::with_capacity(cores.len());
    let mut offset = 0usize;
    for n in cores {
        let end = offset + n;
        let slice = values.get(offset..end)?;
        out.push(slice.iter().sum::<i64>() * TICK_MS);
        offset = end;
    }
    Some(out)
}

fn credit_by_speed(totals: &mut Vec<Vec<i64>>, deltas: &[i64], speeds: &[usize], gate: CpuTimeGate) {
    if totals.len() < speeds.len() {
        totals.resize(speeds.len(), Vec::new());
    }
    let mut offset = 0usize;
    for (cluster, n) in speeds.iter().enumerate() {
        let bucket = &mut totals[cluster];
        if bucket.len() < *n {
            bucket.resize(*n, 0);
        }
        for speed in 0..*n {
            if let Some(d) = deltas.get(offset + speed) {
                bucket[speed] += gate.weigh(*d);
            }
        }
        offset += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock_fs::MockFs;
    use std::path::Path;

    const TABLE: &str = r#"{
        "cpu_clusters": [10, 20],
        "cpu_speed_cluster0": [1, 2],
        "cpu_speed_cluster1": [3]
    }"#;

    const ON: CpuTimeGate = CpuTimeGate {
        on_battery: true,
        wakelock_held: false,
    };

    fn proc(file: &str) -> PathBuf {
        Path::new("/proc").join(file)
    }

    fn reader() -> (MockFs, CpuTimeReader<MockFs>, AveragePowerTable) {
        let fs = MockFs::new();
        let r = CpuTimeReader::with_provider(fs.clone(), CpuTimeReaderConfig::default());
        let t = AveragePowerTable::from_json_str(TABLE).unwrap();
        (fs, r, t)
    }

    fn write_all(fs: &MockFs, active: &str, cluster: &str, freq: &str, uid_time: &str) {
        fs.add_file(&proc(ACTIVE_TIME_FILE), active);
        fs.add_file(&proc(CLUSTER_TIME_FILE), cluster);
        fs.add_file(&proc(FREQ_TIME_FILE), freq);
        fs.add_file(&proc(UID_TIME_FILE), uid_time);
    }

    #[test]
    fn test_first_read_credits_full_value() {
        let (fs, mut r, t) = reader();
        write_all(
            &fs,
            "cpus: 4\n1000: 1 2 3 4\n",
            "policy0: 2 policy2: 2\n1000: 1 1 2 2\n",
            "uid: 300000 600000 900000\n1000: 5 6 7\n",
            "1000: 5000 3000\n",
        );
        let up = r.update_cpu_time(&t, ON);
        assert!(up.success);
        assert_eq!(up.uids.into_iter().collect::<Vec<_>>(), vec![1000]);
        assert_eq!(r.uid_active_time_ms(1000), 100);
        assert_eq!(r.uid_cluster_time_ms(1000, 0), 20);
        assert_eq!(r.uid_cluster_time_ms(1000, 1), 40);
        assert_eq!(r.uid_freq_time_ms(1000, 0, 0), 50);
        assert_eq!(r.uid_freq_time_ms(1000, 0, 1), 60);
        assert_eq!(r.uid_freq_time_ms(1000, 1, 0), 70);
        assert_eq!(r.uid_cpu_time_ms(1000), [5, 3]);
    }

    #[test]
    fn test_increments_only() {
        let (fs, mut r, _t) = reader();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 10\n");
        let mut uids = BTreeSet::new();
        assert!(r.read_uid_active_time(ON, &mut uids));
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 15\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 150);
    }

    #[test]
    fn test_backwards_counter_rejected_then_recovers() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 10\n2000: 1\n");
        assert!(r.read_uid_active_time(ON, &mut uids));

        // uid 1000 went backwards; uid 2000 still advances
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 4\n2000: 3\n");
        assert!(!r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 100);
        assert_eq!(r.uid_active_time_ms(2000), 30);

        // shadow kept at 10, so 12 credits only 2 ticks
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 12\n2000: 3\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 120);
    }

    #[test]
    fn test_rejection_in_cluster_bucket_keeps_whole_line() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(CLUSTER_TIME_FILE), "policy0: 1 policy1: 1\n7: 5 5\n");
        assert!(r.read_uid_cluster_time(ON, &mut uids));
        fs.add_file(&proc(CLUSTER_TIME_FILE), "policy0: 1 policy1: 1\n7: 9 4\n");
        assert!(!r.read_uid_cluster_time(ON, &mut uids));
        assert_eq!(r.uid_cluster_time_ms(7, 0), 50);
        assert_eq!(r.uid_cluster_time_ms(7, 1), 50);
    }

    #[test]
    fn test_off_battery_updates_shadow_without_credit() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        let off = CpuTimeGate::default();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 10\n");
        assert!(r.read_uid_active_time(off, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 0);
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 13\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 30);
    }

    #[test]
    fn test_wakelock_halves_cluster_freq_and_uid_time() {
        let (fs, mut r, t) = reader();
        write_all(
            &fs,
            "cpus: 1\n1000: 10\n",
            "policy0: 1 policy1: 1\n1000: 4 8\n",
            "uid: 1 2 3\n1000: 2 4 6\n",
            "1000: 8000 4000\n",
        );
        let gate = CpuTimeGate {
            on_battery: true,
            wakelock_held: true,
        };
        assert!(r.update_cpu_time(&t, gate).success);
        assert_eq!(r.uid_active_time_ms(1000), 100);
        assert_eq!(r.uid_cluster_time_ms(1000, 0), 20);
        assert_eq!(r.uid_cluster_time_ms(1000, 1), 40);
        assert_eq!(r.uid_freq_time_ms(1000, 0, 1), 20);
        assert_eq!(r.uid_cpu_time_ms(1000), [4, 2]);
    }

    #[test]
    fn test_missing_source_does_not_block_others() {
        let (fs, mut r, t) = reader();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n42: 3\n");
        fs.add_file(&proc(UID_TIME_FILE), "43: 1000 0\n");
        fs.set_no_perm_file(&proc(CLUSTER_TIME_FILE));
        let up = r.update_cpu_time(&t, ON);
        assert!(!up.success);
        assert!(up.uids.contains(&42));
        assert!(up.uids.contains(&43));
        assert_eq!(r.uid_active_time_ms(42), 30);
        assert_eq!(r.uid_cpu_time_ms(43), [1, 0]);
    }

    #[test]
    fn test_malformed_line_fails_reader_but_registers_nothing() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(UID_TIME_FILE), "abc: 1 2\n5: 1\n6: 2000 1000\n");
        assert!(!r.read_uid_time(ON, &mut uids));
        assert_eq!(uids.into_iter().collect::<Vec<_>>(), vec![6]);
        assert_eq!(r.uid_cpu_time_ms(6), [2, 1]);
    }

    #[test]
    fn test_missing_policy_header_fails() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(CLUSTER_TIME_FILE), "1000: 1 2\n");
        assert!(!r.read_uid_cluster_time(ON, &mut uids));
        assert!(uids.is_empty());
    }

    #[test]
    fn test_vanished_uids_are_pruned_after_clean_read() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1: 1\n2: 1\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.tracked_uids()[0], 2);
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1: 2\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.tracked_uids()[0], 1);
        // credited time for the vanished uid is still reported
        assert_eq!(r.uid_active_time_ms(2), 10);
    }

    #[test]
    fn test_reset_keeps_shadow() {
        let (fs, mut r, _t) = reader();
        let mut uids = BTreeSet::new();
        fs.add_file(&proc(ACTIVE_TIME_FILE), "cpus: 1\n1000: 10\n");
        assert!(r.read_uid_active_time(ON, &mut uids));
        r.reset();
        assert_eq!(r.uid_active_time_ms(1000), 0);
        assert!(r.read_uid_active_time(ON, &mut uids));
        assert_eq!(r.uid_active_time_ms(1000), 0);
    }

    #[test]
    fn test_dump_has_labels_for_unknown_uid() {
        let (_fs, r, _t) = reader();
        let mut out = String::new();
        r.dump(&mut out, 12345);
        assert!(out.contains("Total cpu time: userSpaceTime=0ms, systemSpaceTime=0ms"));
        assert!(out.contains("Total cpu time per freq:"));
    }
}
