use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use battery_stats::BatteryStatsCore;
use battery_stats_collector::{
    event_source, lock_core, query_server, task_completion_handler, BatteryStatsCollector,
    CollectorConfig, SharedCore,
};
use clap::Parser;
use log::{debug, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Battery power accounting daemon
#[derive(Debug, Parser)]
struct Command {
    /// Verbose debug output
    #[arg(short, long)]
    verbose: bool,

    /// Run duration in seconds (0 = until SIGINT/SIGTERM)
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// Refresh CPU time once, print the dump and exit
    #[arg(long, default_value = "false")]
    dump_only: bool,

    /// Start as plugged in; accounting begins with the first battery event
    #[arg(long, default_value = "false")]
    plugged: bool,

    /// Read JSON-lines events from this file ("-" for stdin); shuts down at EOF
    #[arg(long)]
    events: Option<PathBuf>,

    /// Address to bind the query HTTP server (/live, /ready, /stats, /dump)
    #[arg(long)]
    query_addr: Option<String>,

    /// Average power table, overrides BATTERY_STATS_POWER_TABLE
    #[arg(long)]
    power_table: Option<PathBuf>,

    /// Persisted stats file, overrides BATTERY_STATS_FILE
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Root of the uid CPU time files, overrides BATTERY_STATS_PROC_ROOT
    #[arg(long)]
    proc_root: Option<PathBuf>,
}

impl Command {
    fn collector_config(&self) -> CollectorConfig {
        let mut cfg = CollectorConfig::from_env();
        if let Some(p) = &self.power_table {
            cfg.power_table_paths = vec![p.clone()];
        }
        if let Some(p) = &self.stats_file {
            cfg.stats_file = p.clone();
        }
        if let Some(p) = &self.proc_root {
            cfg.proc_root = p.clone();
        }
        cfg
    }
}

/// Duration timeout handler - exits when duration completes or cancellation token is triggered
async fn duration_timeout_handler(
    duration: Duration,
    cancellation_token: CancellationToken,
) -> Result<()> {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {
            debug!("Duration timeout reached");
        }
        _ = cancellation_token.cancelled() => {
            debug!("Duration timeout handler cancelled");
        }
    }
    Ok(())
}

/// Signal handler for SIGTERM and SIGINT - triggers cancellation when received
async fn signal_handler(cancellation_token: CancellationToken) -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            debug!("Received SIGTERM, triggering shutdown");
            cancellation_token.cancel();
        }
        _ = sigint.recv() => {
            debug!("Received SIGINT, triggering shutdown");
            cancellation_token.cancel();
        }
        _ = cancellation_token.cancelled() => {
            debug!("Signal handler cancelled");
        }
    }
    Ok(())
}

/// SIGUSR1 dump handler - prints the current stats dump when SIGUSR1 is received
async fn dump_handler(core: SharedCore, cancellation_token: CancellationToken) -> Result<()> {
    let mut sigusr1 = signal(SignalKind::user_defined1())?;

    loop {
        tokio::select! {
            _ = sigusr1.recv() => {
                debug!("Received SIGUSR1, dumping stats");
                let dump = lock_core(&core).dump_info();
                print!("{}", dump);
            }
            _ = cancellation_token.cancelled() => {
                debug!("Dump handler cancelled");
                break;
            }
        }
    }
    Ok(())
}

async fn event_input(
    path: PathBuf,
    tx: mpsc::Sender<battery_stats::StatsEvent>,
    shutdown: CancellationToken,
) -> Result<()> {
    if path.as_os_str() == "-" {
        event_source::run(tokio::io::stdin(), tx, shutdown).await
    } else {
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("opening event input {}", path.display()))?;
        event_source::run(file, tx, shutdown).await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Command::parse();

    if opts.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::init();
    }

    debug!("Starting battery stats with options: {:?}", opts);

    let cfg = opts.collector_config();
    let mut core = BatteryStatsCore::new(cfg.core_config());
    if let Err(e) = core.init() {
        warn!("continuing without a power table: {}", e);
    }

    if opts.dump_only {
        core.update_cpu_time();
        print!("{}", core.dump_info());
        return Ok(());
    }

    core.set_on_battery(!opts.plugged);
    let core: SharedCore = Arc::new(Mutex::new(core));

    let (event_tx, event_rx) = mpsc::channel(cfg.channel_capacity);

    let shutdown_token = CancellationToken::new();
    let task_tracker = TaskTracker::new();

    let collector = BatteryStatsCollector::new();
    task_tracker.spawn(task_completion_handler(
        battery_stats_collector::run(
            collector.clone(),
            core.clone(),
            event_rx,
            shutdown_token.clone(),
            cfg,
        ),
        shutdown_token.clone(),
        "BatteryStatsCollector",
    ));

    if let Some(path) = opts.events.clone() {
        task_tracker.spawn(task_completion_handler(
            event_input(path, event_tx, shutdown_token.clone()),
            shutdown_token.clone(),
            "EventInput",
        ));
    } else {
        // keep the channel open so the collector only stops on shutdown
        let held = event_tx;
        let token = shutdown_token.clone();
        task_tracker.spawn(async move {
            token.cancelled().await;
            drop(held);
        });
    }

    if let Some(addr) = opts.query_addr.clone() {
        task_tracker.spawn(task_completion_handler(
            query_server::run(addr, collector.clone(), core.clone(), shutdown_token.clone()),
            shutdown_token.clone(),
            "QueryServer",
        ));
    }

    if opts.duration > 0 {
        let duration = Duration::from_secs(opts.duration);
        task_tracker.spawn(task_completion_handler(
            duration_timeout_handler(duration, shutdown_token.clone()),
            shutdown_token.clone(),
            "DurationTimeoutHandler",
        ));
    }

    task_tracker.spawn(task_completion_handler(
        signal_handler(shutdown_token.clone()),
        shutdown_token.clone(),
        "SignalHandler",
    ));

    task_tracker.spawn(task_completion_handler(
        dump_handler(core.clone(), shutdown_token.clone()),
        shutdown_token.clone(),
        "DumpHandler",
    ));

    task_tracker.close();
    info!("Battery stats collection started.");

    debug!("Waiting for all tasks to complete...");
    task_tracker.wait().await;

    print!("{}", lock_core(&core).dump_info());
    info!("Shutdown complete");
    Ok(())
}
