//! The aggregation core.
//!
//! Owns the time base, the power table, the CPU reader and every entity.
//! Events are routed to the timer or counter of the entity that owns their
//! stats type; queries recompute power across all entities and assemble
//! the result list.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::accumulator::{ActiveTimer, Counter};
use crate::cpu_time_reader::{CpuTimeGate, CpuTimeReader, CpuTimeReaderConfig};
use crate::entities::{create_entities, AppEntity, CalcEnv, StatsEntity, UserEntity};
use crate::error::{io_error, Error, Result};
use crate::power_table::{
    default_policy_layers, default_table_paths, table_candidates, AveragePowerTable,
};
use crate::time_base::TimeBase;
use crate::types::{
    ConsumptionType, StatsEvent, StatsInfo, StatsState, StatsType, INVALID_VALUE,
};
use crate::{FsProvider, RealFs};

pub const DEFAULT_STATS_FILE: &str = "/data/system/battery_stats.json";

const INVALID_LEVEL: i16 = INVALID_VALUE as i16;

/// Entities whose per-app share rolls up into an APP row.
const APP_PARTS: [ConsumptionType; 11] = [
    ConsumptionType::Bluetooth,
    ConsumptionType::Radio,
    ConsumptionType::Wifi,
    ConsumptionType::Camera,
    ConsumptionType::Flashlight,
    ConsumptionType::Audio,
    ConsumptionType::Sensor,
    ConsumptionType::Gps,
    ConsumptionType::Cpu,
    ConsumptionType::Wakelock,
    ConsumptionType::Alarm,
];

/// Entities that publish a device-wide row.
const HARDWARE_PARTS: [ConsumptionType; 6] = [
    ConsumptionType::Bluetooth,
    ConsumptionType::Idle,
    ConsumptionType::Phone,
    ConsumptionType::Radio,
    ConsumptionType::Screen,
    ConsumptionType::Wifi,
];

// Per-uid activity listed in the dump.
const UID_DUMP_TYPES: [StatsType; 14] = [
    StatsType::BluetoothScan,
    StatsType::BluetoothRx,
    StatsType::BluetoothTx,
    StatsType::WifiScan,
    StatsType::WifiRx,
    StatsType::WifiTx,
    StatsType::RadioRx,
    StatsType::RadioTx,
    StatsType::CameraOn,
    StatsType::FlashlightOn,
    StatsType::GpsOn,
    StatsType::AudioOn,
    StatsType::SensorGravityOn,
    StatsType::WakelockHold,
];

#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Average power table candidates, tried in order.
    pub power_table_paths: Vec<PathBuf>,
    /// Config policy layers searched for a last-resort table.
    pub policy_layers: Vec<PathBuf>,
    /// Where computed stats are persisted across restarts.
    pub stats_file: PathBuf,
    pub cpu: CpuTimeReaderConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            power_table_paths: default_table_paths(),
            policy_layers: default_policy_layers(),
            stats_file: PathBuf::from(DEFAULT_STATS_FILE),
            cpu: CpuTimeReaderConfig::default(),
        }
    }
}

/// Entity that owns the timers and counters for `stats_type`.
fn owning_entity(stats_type: StatsType) -> Option<ConsumptionType> {
    use StatsType::*;
    let owner = match stats_type {
        BluetoothOn | BluetoothScan | BluetoothRx | BluetoothTx => ConsumptionType::Bluetooth,
        WifiOn | WifiScan | WifiRx | WifiTx => ConsumptionType::Wifi,
        RadioOn | RadioScan | RadioRx | RadioTx => ConsumptionType::Radio,
        PhoneActive => ConsumptionType::Phone,
        ScreenOn | ScreenBrightness => ConsumptionType::Screen,
        CameraOn => ConsumptionType::Camera,
        FlashlightOn => ConsumptionType::Flashlight,
        GpsOn => ConsumptionType::Gps,
        SensorGravityOn | SensorProximityOn => ConsumptionType::Sensor,
        AudioOn => ConsumptionType::Audio,
        WakelockHold => ConsumptionType::Wakelock,
        Alarm => ConsumptionType::Alarm,
        PhoneIdle | CpuSuspend => ConsumptionType::Idle,
        CpuCluster | CpuSpeed | CpuActive => ConsumptionType::Cpu,
        Invalid => return None,
    };
    Some(owner)
}

/// Types whose time is tracked for the whole device rather than per uid.
fn is_device_wide(stats_type: StatsType) -> bool {
    use StatsType::*;
    matches!(
        stats_type,
        BluetoothOn
            | WifiOn
            | RadioOn
            | RadioScan
            | PhoneActive
            | ScreenOn
            | ScreenBrightness
            | PhoneIdle
            | CpuSuspend
    )
}

fn percent_of(mah: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (mah / total).clamp(0.0, 1.0)
}

pub struct BatteryStatsCore<P: FsProvider = RealFs> {
    fs: P,
    cfg: CoreConfig,
    time_base: Arc<TimeBase>,
    table: AveragePowerTable,
    table_source: Option<PathBuf>,
    cpu_reader: CpuTimeReader<P>,
    entities: BTreeMap<ConsumptionType, Box<dyn StatsEntity>>,
    apps: AppEntity,
    users: UserEntity,
    stats_list: Vec<StatsInfo>,
    total_power_mah: f64,
    last_signal_level: i16,
    last_brightness_level: i16,
    held_wakelocks: HashSet<i32>,
    debug_info: String,
    initialized: bool,
}

impl BatteryStatsCore<RealFs> {
    /// Core on the real filesystem and the system clocks.
    pub fn new(cfg: CoreConfig) -> Self {
        Self::with_provider(RealFs, TimeBase::system(), cfg)
    }
}

impl<P: FsProvider> BatteryStatsCore<P> {
    pub fn with_provider(fs: P, time_base: Arc<TimeBase>, cfg: CoreConfig) -> Self {
        let cpu_reader = CpuTimeReader::with_provider(fs.clone(), cfg.cpu.clone());
        Self {
            fs,
            cfg,
            time_base,
            table: AveragePowerTable::default(),
            table_source: None,
            cpu_reader,
            entities: BTreeMap::new(),
            apps: AppEntity::default(),
            users: UserEntity::default(),
            stats_list: Vec::new(),
            total_power_mah: 0.0,
            last_signal_level: INVALID_LEVEL,
            last_brightness_level: INVALID_LEVEL,
            held_wakelocks: HashSet::new(),
            debug_info: String::new(),
            initialized: false,
        }
    }

    /// Create the entities, load the power table, take a CPU baseline and
    /// restore persisted stats.
    ///
    /// Only a missing power table is reported as an error, and even then
    /// the core is initialized and keeps running with every current at 0.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            debug!("battery stats core already initialized");
            return Ok(());
        }
        self.entities = create_entities(&self.time_base);

        let candidates =
            table_candidates(&self.fs, &self.cfg.power_table_paths, &self.cfg.policy_layers);
        let table_result = match AveragePowerTable::init(&self.fs, &candidates) {
            Ok((table, path)) => {
                self.table = table;
                self.table_source = Some(path);
                Ok(())
            }
            Err(e) => {
                warn!("{}; all power figures will read 0", e);
                Err(e)
            }
        };
        self.initialized = true;

        if !self.update_cpu_time() {
            debug!("initial cpu time read incomplete");
        }
        match self.load_stats() {
            Ok(()) => info!(
                "restored {} stats rows from {}",
                self.stats_list.len(),
                self.cfg.stats_file.display()
            ),
            Err(e) => debug!("no stats restored: {}", e),
        }
        info!("battery stats core initialized ({} entities)", self.entities.len());
        table_result
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn time_base(&self) -> &Arc<TimeBase> {
        &self.time_base
    }

    pub fn power_table(&self) -> &AveragePowerTable {
        &self.table
    }

    pub fn cpu_reader(&self) -> &CpuTimeReader<P> {
        &self.cpu_reader
    }

    pub fn set_on_battery(&mut self, on_battery: bool) {
        if self.time_base.is_on_battery() != on_battery {
            info!("on battery: {}", on_battery);
        }
        self.time_base.set_on_battery(on_battery);
    }

    pub fn update_stats(&mut self, event: StatsEvent) {
        match event {
            StatsEvent::State {
                stats_type,
                state,
                level,
                uid,
            } => self.update_stats_state(stats_type, state, level, uid),
            StatsEvent::Traffic {
                stats_type,
                time_ms,
                data,
                uid,
            } => self.update_stats_traffic(stats_type, time_ms, data, uid),
            StatsEvent::Battery { on_battery } => self.set_on_battery(on_battery),
        }
    }

    /// Route a state or level change.
    pub fn update_stats_state(
        &mut self,
        stats_type: StatsType,
        state: StatsState,
        level: i16,
        uid: i32,
    ) {
        if !self.initialized {
            debug!("dropping {} event before init", stats_type);
            return;
        }
        if uid > INVALID_VALUE {
            self.apps.update_uid_map(uid);
        }
        match stats_type {
            StatsType::RadioOn | StatsType::RadioScan => self.update_radio(state, level),
            StatsType::ScreenOn | StatsType::ScreenBrightness => self.update_screen(state, level),
            StatsType::BluetoothOn | StatsType::WifiOn | StatsType::PhoneActive => {
                self.toggle_timer(stats_type, INVALID_VALUE, state)
            }
            StatsType::WifiScan => {
                self.toggle_timer(stats_type, uid, state);
                if state == StatsState::Activated {
                    self.add_count(stats_type, uid, 1);
                }
            }
            StatsType::WakelockHold => {
                self.toggle_timer(stats_type, uid, state);
                match state {
                    StatsState::Activated => {
                        self.held_wakelocks.insert(uid);
                    }
                    StatsState::Deactivated => {
                        self.held_wakelocks.remove(&uid);
                    }
                    _ => {}
                }
            }
            StatsType::Alarm => self.add_count(stats_type, uid, 1),
            StatsType::BluetoothScan
            | StatsType::CameraOn
            | StatsType::FlashlightOn
            | StatsType::GpsOn
            | StatsType::SensorGravityOn
            | StatsType::SensorProximityOn
            | StatsType::AudioOn => self.toggle_timer(stats_type, uid, state),
            other => debug!("dropping unsupported state event {}", other),
        }
    }

    /// Route a traffic report: the duration goes to the uid's timer and the
    /// bytes to its counter.
    pub fn update_stats_traffic(&mut self, stats_type: StatsType, time_ms: i64, data: i64, uid: i32) {
        if !self.initialized {
            debug!("dropping {} traffic before init", stats_type);
            return;
        }
        if !matches!(
            stats_type,
            StatsType::BluetoothRx
                | StatsType::BluetoothTx
                | StatsType::WifiRx
                | StatsType::WifiTx
                | StatsType::RadioRx
                | StatsType::RadioTx
        ) {
            debug!("dropping unsupported traffic event {}", stats_type);
            return;
        }
        if uid > INVALID_VALUE {
            self.apps.update_uid_map(uid);
        }
        if !self.time_base.is_on_battery() {
            debug!("ignoring {} traffic while charging", stats_type);
            return;
        }
        if let Some(timer) = self.timer(stats_type, uid, INVALID_LEVEL) {
            timer.add_running_time_ms(time_ms);
        }
        self.add_count(stats_type, uid, data);
    }

    /// Refresh CPU time from the kernel. Returns false if any source failed.
    pub fn update_cpu_time(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        let gate = CpuTimeGate {
            on_battery: self.time_base.is_on_battery(),
            wakelock_held: !self.held_wakelocks.is_empty(),
        };
        let update = self.cpu_reader.update_cpu_time(&self.table, gate);
        for uid in &update.uids {
            self.apps.update_uid_map(*uid);
        }
        update.success
    }

    fn update_radio(&mut self, state: StatsState, level: i16) {
        if state == StatsState::NetworkSearch {
            self.start_timer(StatsType::RadioScan, INVALID_VALUE, INVALID_LEVEL);
        } else {
            self.stop_timer(StatsType::RadioScan, INVALID_VALUE, INVALID_LEVEL);
        }
        if level > INVALID_LEVEL && level != self.last_signal_level {
            if self.last_signal_level > INVALID_LEVEL {
                self.stop_timer(StatsType::RadioOn, INVALID_VALUE, self.last_signal_level);
            }
            self.start_timer(StatsType::RadioOn, INVALID_VALUE, level);
            self.last_signal_level = level;
        }
    }

    fn update_screen(&mut self, state: StatsState, level: i16) {
        if state == StatsState::DisplayOff {
            self.time_base.set_screen_off(true);
            self.stop_timer(StatsType::ScreenOn, INVALID_VALUE, INVALID_LEVEL);
            if self.last_brightness_level > INVALID_LEVEL {
                self.stop_timer(
                    StatsType::ScreenBrightness,
                    INVALID_VALUE,
                    self.last_brightness_level,
                );
            }
            return;
        }
        self.time_base.set_screen_off(false);
        self.start_timer(StatsType::ScreenOn, INVALID_VALUE, INVALID_LEVEL);
        // a state change without a level resumes the last brightness
        let target = if level > INVALID_LEVEL {
            level
        } else {
            self.last_brightness_level
        };
        if target <= INVALID_LEVEL {
            return;
        }
        if self.last_brightness_level > INVALID_LEVEL && self.last_brightness_level != target {
            self.stop_timer(
                StatsType::ScreenBrightness,
                INVALID_VALUE,
                self.last_brightness_level,
            );
        }
        self.start_timer(StatsType::ScreenBrightness, INVALID_VALUE, target);
        self.last_brightness_level = target;
    }

    fn timer(&mut self, stats_type: StatsType, uid: i32, level: i16) -> Option<&mut ActiveTimer> {
        let owner = owning_entity(stats_type)?;
        let entity = self.entities.get_mut(&owner)?;
        match entity.timer(stats_type, uid, level) {
            Some(timer) => Some(timer),
            None => {
                debug!("no {} timer for uid {} level {}", stats_type, uid, level);
                None
            }
        }
    }

    fn counter(&mut self, stats_type: StatsType, uid: i32) -> Option<&mut Counter> {
        let owner = owning_entity(stats_type)?;
        let entity = self.entities.get_mut(&owner)?;
        match entity.counter(stats_type, uid) {
            Some(counter) => Some(counter),
            None => {
                debug!("no {} counter for uid {}", stats_type, uid);
                None
            }
        }
    }

    fn start_timer(&mut self, stats_type: StatsType, uid: i32, level: i16) {
        if let Some(timer) = self.timer(stats_type, uid, level) {
            timer.start_running();
        }
    }

    fn stop_timer(&mut self, stats_type: StatsType, uid: i32, level: i16) {
        if let Some(timer) = self.timer(stats_type, uid, level) {
            timer.stop_running();
        }
    }

    fn toggle_timer(&mut self, stats_type: StatsType, uid: i32, state: StatsState) {
        match state {
            StatsState::Activated => self.start_timer(stats_type, uid, INVALID_LEVEL),
            StatsState::Deactivated => self.stop_timer(stats_type, uid, INVALID_LEVEL),
            other => debug!("ignoring state {:?} for {}", other, stats_type),
        }
    }

    fn add_count(&mut self, stats_type: StatsType, uid: i32, delta: i64) {
        if let Some(counter) = self.counter(stats_type, uid) {
            counter.add_count(delta);
        }
    }

    /// Recompute every app, hardware and user row.
    fn compute_power(&mut self) {
        let Self {
            table,
            cpu_reader,
            entities,
            apps,
            users,
            stats_list,
            ..
        } = self;
        let env = CalcEnv {
            table: &*table,
            cpu: &*cpu_reader,
        };
        stats_list.clear();
        users.reset();

        for uid in apps.uids() {
            let mut power = 0.0;
            for part in APP_PARTS {
                if let Some(entity) = entities.get_mut(&part) {
                    entity.calculate(uid, &env);
                    power += entity.entity_power_mah(uid);
                }
            }
            apps.set_power(uid, power);
            users.aggregate_user_power_mah(uid, power);
            stats_list.push(StatsInfo::app(uid, power));
        }
        for part in HARDWARE_PARTS {
            if let Some(entity) = entities.get_mut(&part) {
                if let Some(row) = entity.calculate(INVALID_VALUE, &env) {
                    stats_list.push(row);
                }
            }
        }
        let total: f64 = stats_list.iter().map(|r| r.power_mah).sum();
        stats_list.extend(users.rows());
        self.total_power_mah = total;
        debug!(
            "computed {} stats rows, total {:.6}mAh",
            self.stats_list.len(),
            total
        );
    }

    /// Recompute and return every row: one per app, one per hardware part
    /// and one per user.
    pub fn battery_stats(&mut self) -> Vec<StatsInfo> {
        if !self.initialized {
            return Vec::new();
        }
        self.compute_power();
        self.stats_list.clone()
    }

    /// Where the power table was loaded from, if anywhere.
    pub fn power_table_source(&self) -> Option<&Path> {
        self.table_source.as_deref()
    }

    /// Rows as of the last recomputation or restore, without recomputing.
    pub fn last_stats(&self) -> &[StatsInfo] {
        &self.stats_list
    }

    /// Total across app and hardware rows from the last recomputation.
    pub fn total_power_mah(&self) -> f64 {
        self.total_power_mah
    }

    pub fn app_stats_mah(&mut self, uid: i32) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.compute_power();
        self.app_row_mah(uid)
    }

    pub fn app_stats_percent(&mut self, uid: i32) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.compute_power();
        percent_of(self.app_row_mah(uid), self.total_power_mah)
    }

    pub fn part_stats_mah(&mut self, consumption_type: ConsumptionType) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.compute_power();
        self.part_row_mah(consumption_type)
    }

    pub fn part_stats_percent(&mut self, consumption_type: ConsumptionType) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        self.compute_power();
        percent_of(self.part_row_mah(consumption_type), self.total_power_mah)
    }

    fn app_row_mah(&self, uid: i32) -> f64 {
        self.stats_list
            .iter()
            .find(|r| r.consumption_type == ConsumptionType::App && r.uid == uid)
            .map(|r| r.power_mah)
            .unwrap_or(0.0)
    }

    fn part_row_mah(&self, consumption_type: ConsumptionType) -> f64 {
        if matches!(
            consumption_type,
            ConsumptionType::Invalid | ConsumptionType::App | ConsumptionType::User
        ) {
            return 0.0;
        }
        self.stats_list
            .iter()
            .find(|r| r.consumption_type == consumption_type)
            .map(|r| r.power_mah)
            .unwrap_or(0.0)
    }

    /// Accumulated on-battery time for `stats_type`. Device-wide types
    /// ignore `uid`.
    pub fn total_time_ms(&mut self, stats_type: StatsType, uid: i32) -> i64 {
        if !self.initialized {
            return 0;
        }
        let Some(owner) = owning_entity(stats_type) else {
            debug!("no time tracked for {}", stats_type);
            return 0;
        };
        let uid = if is_device_wide(stats_type) {
            INVALID_VALUE
        } else {
            uid
        };
        let env = CalcEnv {
            table: &self.table,
            cpu: &self.cpu_reader,
        };
        let Some(entity) = self.entities.get_mut(&owner) else {
            return 0;
        };
        if owner == ConsumptionType::Cpu {
            // cpu time is sampled from the reader at calculate time
            entity.calculate(uid, &env);
        }
        entity.active_time_ms(stats_type, uid, INVALID_LEVEL)
    }

    pub fn total_time_second(&mut self, stats_type: StatsType, uid: i32) -> u64 {
        u64::try_from(self.total_time_ms(stats_type, uid) / 1_000).unwrap_or(0)
    }

    /// Bytes transferred (or events counted) for `stats_type` and `uid`.
    pub fn total_data_bytes(&self, stats_type: StatsType, uid: i32) -> u64 {
        owning_entity(stats_type)
            .and_then(|owner| self.entities.get(&owner))
            .and_then(|e| u64::try_from(e.traffic_bytes(stats_type, uid)).ok())
            .unwrap_or(0)
    }

    /// Zero every figure. The on-battery clocks keep running.
    pub fn reset(&mut self) {
        for entity in self.entities.values_mut() {
            entity.reset();
        }
        self.apps.reset();
        self.users.reset();
        self.cpu_reader.reset();
        self.stats_list.clear();
        self.total_power_mah = 0.0;
        // reset stopped every timer; the next event restarts them
        self.last_signal_level = INVALID_LEVEL;
        self.last_brightness_level = INVALID_LEVEL;
        self.held_wakelocks.clear();
        self.debug_info.clear();
        info!("battery stats reset");
    }

    pub fn update_debug_info(&mut self, info: &str) {
        self.debug_info.push_str(info);
        if !info.ends_with('\n') {
            self.debug_info.push('\n');
        }
    }

    pub fn dump_info(&mut self) -> String {
        let mut out = String::from("BATTERY STATS DUMP:\n");
        if !self.initialized {
            out.push_str("battery stats core not initialized\n");
            return out;
        }
        let _ = writeln!(
            out,
            "On battery: {}, screen off: {}",
            self.time_base.is_on_battery(),
            self.time_base.is_screen_off()
        );
        let _ = writeln!(
            out,
            "On battery boot time: {}ms, up time: {}ms",
            self.time_base.on_battery_boot_time_ms(),
            self.time_base.on_battery_up_time_ms()
        );
        match &self.table_source {
            Some(path) => {
                let _ = writeln!(
                    out,
                    "Power table: {} ({} entries)",
                    path.display(),
                    self.table.len()
                );
            }
            None => out.push_str("Power table: none\n"),
        }

        self.compute_power();
        for part in HARDWARE_PARTS {
            let _ = writeln!(out, "\n[{}]", part);
            if let Some(entity) = self.entities.get_mut(&part) {
                entity.dump(&mut out);
            }
        }

        out.push_str("\n[app]\n");
        self.apps.dump(&mut out);
        for uid in self.apps.uids() {
            let _ = writeln!(out, "uid {}:", uid);
            self.cpu_reader.dump(&mut out, uid);
            for stats_type in UID_DUMP_TYPES {
                let ms = self.total_time_ms(stats_type, uid);
                if ms > 0 {
                    let _ = writeln!(out, "{} time: {}ms", stats_type, ms);
                }
            }
            for stats_type in [StatsType::WifiScan, StatsType::Alarm] {
                let count = self.total_data_bytes(stats_type, uid);
                if count > 0 {
                    let _ = writeln!(out, "{} count: {}", stats_type, count);
                }
            }
        }

        out.push_str("\n[user]\n");
        for row in self.users.rows() {
            let _ = writeln!(out, "user {} power: {:.6}mAh", row.user_id, row.power_mah);
        }
        let _ = writeln!(out, "\nTotal power: {:.6}mAh", self.total_power_mah);

        out.push_str("\n[debug]\n");
        out.push_str(&self.debug_info);
        out
    }

    /// Recompute and write `{ "<uid or consumption id>": mAh }` to the stats
    /// file. User rows are derived and not written.
    pub fn save_stats(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.compute_power();
        let rows: BTreeMap<String, f64> = self
            .stats_list
            .iter()
            .filter_map(|r| match r.consumption_type {
                ConsumptionType::User => None,
                ConsumptionType::App => Some((r.uid.to_string(), r.power_mah)),
                other => Some((other.id().to_string(), r.power_mah)),
            })
            .collect();
        let path = &self.cfg.stats_file;
        let text = serde_json::to_string_pretty(&rows).map_err(|e| Error::Persist {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.fs
            .write_str(path, &text)
            .map_err(|e| io_error(path, e))?;
        debug!("saved {} stats rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Replace the row list with the persisted one. User rows are rebuilt
    /// from the app rows; unknown keys are skipped.
    pub fn load_stats(&mut self) -> Result<()> {
        let path = self.cfg.stats_file.clone();
        let text = self
            .fs
            .read_to_string(&path)
            .map_err(|e| io_error(&path, e))?;
        let saved: BTreeMap<String, f64> =
            serde_json::from_str(&text).map_err(|source| Error::Parse {
                path: path.clone(),
                source,
            })?;

        let mut rows = Vec::with_capacity(saved.len());
        let mut users = UserEntity::default();
        for (key, mah) in saved {
            let Ok(id) = key.trim().parse::<i32>() else {
                warn!("skipping stats entry with non-numeric key {:?}", key);
                continue;
            };
            if id > INVALID_VALUE {
                users.aggregate_user_power_mah(id, mah);
                rows.push(StatsInfo::app(id, mah));
                continue;
            }
            match ConsumptionType::from_id(id) {
                Some(
                    ConsumptionType::Invalid | ConsumptionType::App | ConsumptionType::User,
                )
                | None => warn!("skipping stats entry with unknown id {}", id),
                Some(part) => rows.push(StatsInfo::hardware(part, mah)),
            }
        }
        self.total_power_mah = rows.iter().map(|r| r.power_mah).sum();
        rows.extend(users.rows());
        self.stats_list = rows;
        Ok(())
    }
}
