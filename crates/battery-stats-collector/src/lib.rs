use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use battery_stats::{
    BatteryStatsCore, ConsumptionType, CoreConfig, CpuTimeReaderConfig, FsProvider, RealFs,
    StatsEvent,
};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

pub mod event_source;
pub mod query_server;

/// Default channel capacity for incoming activity events
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Aggregation core shared between the collector loop and readers.
pub type SharedCore<P = RealFs> = Arc<Mutex<BatteryStatsCore<P>>>;

/// Lock the core, recovering the guard if a previous holder panicked.
pub fn lock_core<P: FsProvider>(core: &Mutex<BatteryStatsCore<P>>) -> MutexGuard<'_, BatteryStatsCore<P>> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Battery stats collector instance state
#[derive(Default)]
pub struct BatteryStatsCollector {
    cpu_synced: AtomicBool,
}

impl BatteryStatsCollector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns true once the first CPU time refresh has run, so per-uid
    /// CPU power reflects the kernel counters.
    pub fn ready(&self) -> bool {
        self.cpu_synced.load(Ordering::Relaxed)
    }
}

/// Internal mutable state and handlers for the collector.
///
/// Handlers are kept apart from the event loop so they can be unit tested
/// without timers.
pub(crate) struct CollectorState<P: FsProvider> {
    this: Arc<BatteryStatsCollector>,
    core: SharedCore<P>,
    events_handled: u64,
    cpu_failures: u64,
    save_failures: u64,
}

impl<P: FsProvider> CollectorState<P> {
    pub(crate) fn new(this: Arc<BatteryStatsCollector>, core: SharedCore<P>) -> Self {
        Self {
            this,
            core,
            events_handled: 0,
            cpu_failures: 0,
            save_failures: 0,
        }
    }

    /// Handle a CPU refresh tick: pull per-uid CPU time from the kernel.
    pub(crate) fn handle_cpu_timer(&mut self) {
        let ok = lock_core(&self.core).update_cpu_time();
        if !ok {
            self.cpu_failures += 1;
            debug!("cpu time refresh incomplete");
        }
        if !self.this.cpu_synced.load(Ordering::Relaxed) {
            self.this.cpu_synced.store(true, Ordering::Relaxed);
        }
    }

    /// Handle a persistence tick.
    pub(crate) fn handle_save_timer(&mut self) {
        if let Err(e) = lock_core(&self.core).save_stats() {
            self.save_failures += 1;
            warn!("failed to persist battery stats: {}", e);
        }
    }

    /// Handle periodic health logging.
    pub(crate) fn handle_health_timer(&self) {
        let (apps, total_mah, tracked) = self.compute_health();
        info!(
            "battery stats health: events={}, apps={}, total_mah={:.3}, tracked_uids={:?}, cpu_failures={}, save_failures={}",
            self.events_handled, apps, total_mah, tracked, self.cpu_failures, self.save_failures
        );
    }

    /// Number of app rows and total power from the latest computation, and
    /// the uids the CPU time reader tracks per proc source.
    pub(crate) fn compute_health(&self) -> (usize, f64, [usize; 4]) {
        let core = lock_core(&self.core);
        let apps = core
            .last_stats()
            .iter()
            .filter(|r| r.consumption_type == ConsumptionType::App)
            .count();
        (apps, core.total_power_mah(), core.cpu_reader().tracked_uids())
    }

    /// Handle one activity event.
    pub(crate) fn handle_event(&mut self, ev: StatsEvent) {
        lock_core(&self.core).update_stats(ev);
        self.events_handled += 1;
    }
}

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    /// CPU time refresh interval
    pub cpu_interval: Duration,
    /// Persistence interval
    pub save_interval: Duration,
    /// Health logging interval
    pub health_interval: Duration,
    /// Incoming event channel capacity
    pub channel_capacity: usize,
    /// Power table candidates, first readable wins
    pub power_table_paths: Vec<PathBuf>,
    /// Persisted stats file
    pub stats_file: PathBuf,
    /// Root of the kernel uid CPU time files
    pub proc_root: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let core = CoreConfig::default();
        Self {
            cpu_interval: Duration::from_secs(30),
            save_interval: Duration::from_secs(600),
            health_interval: Duration::from_secs(60),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            power_table_paths: core.power_table_paths,
            stats_file: core.stats_file,
            proc_root: core.cpu.proc_root,
        }
    }
}

impl CollectorConfig {
    /// Create a config from environment variables with sensible defaults.
    /// Supported variables:
    /// - `BATTERY_STATS_CPU_INTERVAL` (humantime, e.g., "30s")
    /// - `BATTERY_STATS_SAVE_INTERVAL` (humantime)
    /// - `BATTERY_STATS_HEALTH_INTERVAL` (humantime)
    /// - `BATTERY_STATS_CHANNEL_CAPACITY` (usize > 0)
    /// - `BATTERY_STATS_POWER_TABLE` (path, replaces the default candidates)
    /// - `BATTERY_STATS_FILE` (path)
    /// - `BATTERY_STATS_PROC_ROOT` (path)
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(s) = env::var("BATTERY_STATS_CPU_INTERVAL") {
            if let Ok(d) = humantime::parse_duration(&s) {
                cfg.cpu_interval = d;
            }
        }
        if let Ok(s) = env::var("BATTERY_STATS_SAVE_INTERVAL") {
            if let Ok(d) = humantime::parse_duration(&s) {
                cfg.save_interval = d;
            }
        }
        if let Ok(s) = env::var("BATTERY_STATS_HEALTH_INTERVAL") {
            if let Ok(d) = humantime::parse_duration(&s) {
                cfg.health_interval = d;
            }
        }
        if let Ok(s) = env::var("BATTERY_STATS_CHANNEL_CAPACITY") {
            if let Ok(n) = s.parse::<usize>() {
                if n > 0 {
                    cfg.channel_capacity = n;
                }
            }
        }
        if let Ok(p) = env::var("BATTERY_STATS_POWER_TABLE") {
            if !p.is_empty() {
                cfg.power_table_paths = vec![PathBuf::from(p)];
            }
        }
        if let Ok(p) = env::var("BATTERY_STATS_FILE") {
            if !p.is_empty() {
                cfg.stats_file = PathBuf::from(p);
            }
        }
        if let Ok(p) = env::var("BATTERY_STATS_PROC_ROOT") {
            if !p.is_empty() {
                cfg.proc_root = PathBuf::from(p);
            }
        }
        cfg
    }

    /// Configuration for the aggregation core.
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            power_table_paths: self.power_table_paths.clone(),
            stats_file: self.stats_file.clone(),
            cpu: CpuTimeReaderConfig {
                proc_root: self.proc_root.clone(),
            },
            ..CoreConfig::default()
        }
    }
}

/// Run the collector loop until `shutdown` fires.
///
/// CPU time is refreshed immediately and then every `cpu_interval`. Stats
/// are persisted every `save_interval` and once more on shutdown, after
/// queued events are drained.
pub async fn run<P: FsProvider + Send + 'static>(
    this: Arc<BatteryStatsCollector>,
    core: SharedCore<P>,
    mut events: mpsc::Receiver<StatsEvent>,
    shutdown: CancellationToken,
    cfg: CollectorConfig,
) -> Result<()> {
    let mut state = CollectorState::new(this, core);

    let mut cpu_tick = tokio::time::interval(cfg.cpu_interval);
    let mut save_tick = interval_at(Instant::now() + cfg.save_interval, cfg.save_interval);
    let mut health_tick = interval_at(Instant::now() + cfg.health_interval, cfg.health_interval);
    let mut events_open = true;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break;
            }
            _ = cpu_tick.tick() => {
                state.handle_cpu_timer();
            }
            _ = save_tick.tick() => {
                state.handle_save_timer();
            }
            _ = health_tick.tick() => {
                state.handle_health_timer();
            }
            maybe_ev = events.recv(), if events_open => {
                match maybe_ev {
                    Some(ev) => state.handle_event(ev),
                    None => {
                        debug!("event channel closed");
                        events_open = false;
                    }
                }
            }
        }
    }

    // events already queued before shutdown still count
    while let Ok(ev) = events.try_recv() {
        state.handle_event(ev);
    }
    state.handle_save_timer();
    info!(
        "battery stats collector stopped after {} events",
        state.events_handled
    );
    Ok(())
}

/// Await a task, log how it ended and cancel `shutdown` so sibling tasks stop too.
pub async fn task_completion_handler<F>(task: F, shutdown: CancellationToken, name: &'static str)
where
    F: Future<Output = Result<()>>,
{
    match task.await {
        Ok(()) => debug!("{} completed", name),
        Err(e) => error!("{} failed: {:#}", name, e),
    }
    shutdown.cancel();
}
