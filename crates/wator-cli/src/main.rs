//! `wator`: loads a planet and a rules configuration, builds the chronon
//! engine farm, and drives its lifecycle from signals (§6.5) — the thin
//! binary crate wiring together `wator-core` and `wator-io`.

use anyhow::{Context, Result};
use clap::Parser;
use signal_hook::consts::{SIGALRM, SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use wator_core::snapshot::BufferSink;
use wator_core::{build_farm, CheckpointSink, Params, SnapshotSink};
use wator_io::{load_planet, load_rules_config, load_runtime_config, FileCheckpointSink, TcpSnapshotSink};

/// Automatic checkpoint cadence, matching the original's `#define SEC 150`
/// (`alarm(SEC)` after every `checkpoint()`), reborn here as a sleeping
/// thread instead of a raw `alarm()` syscall (§6.4).
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(150);

/// How long to wait for a visualizer to connect to the snapshot socket
/// before giving up and publishing nowhere.
const SNAPSHOT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(3);

/// Positional plus option args (§6.6).
#[derive(Parser, Debug)]
#[command(name = "wator", version, about = "Wa-Tor concurrent chronon engine")]
struct Args {
    /// Planet text file to load (§6.2).
    planet: PathBuf,

    /// Number of worker threads. Overrides `wator.toml` if given.
    #[arg(short = 'n', long = "workers")]
    workers: Option<usize>,

    /// Chronons between published snapshots. Overrides `wator.toml`.
    #[arg(short = 'v', long = "interval")]
    interval: Option<u32>,

    /// Milliseconds to sleep between chronons (pacing). Overrides `wator.toml`.
    #[arg(short = 'd', long = "delay")]
    delay_ms: Option<u64>,

    /// Checkpoint dump file, written on `SIGALRM`/`SIGUSR1` and every
    /// `CHECKPOINT_INTERVAL`. `--dump` is the original flag name.
    #[arg(short = 'f', long = "checkpoint", alias = "dump", default_value = "wator.check")]
    checkpoint: PathBuf,

    /// Rules configuration file providing `sd`, `sb`, `fb` (§6.1).
    #[arg(long = "config", default_value = "wator.conf")]
    config: PathBuf,

    /// TCP address the snapshot publisher listens on for one visualizer
    /// connection (§6.3).
    #[arg(long = "publish-addr", default_value = "127.0.0.1:7077")]
    publish_addr: String,
}

fn configure_logging() -> Result<WorkerGuard> {
    let log_path = PathBuf::from("wator.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(".", "wator.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))?;
    Ok(guard)
}

/// Bind `addr` and wait up to [`SNAPSHOT_ACCEPT_TIMEOUT`] for a visualizer
/// to connect; fall back to a discarding sink so the simulation can run
/// headless (§7: a publish failure is transient, never fatal).
fn open_snapshot_sink(addr: &str) -> Box<dyn SnapshotSink> {
    let listener = match TcpListener::bind(addr) {
        Ok(listener) => listener,
        Err(err) => {
            warn!(%err, addr, "failed to bind snapshot publisher socket, continuing without one");
            return Box::new(BufferSink::default());
        }
    };

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(TcpSnapshotSink::accept(&listener));
    });

    match rx.recv_timeout(SNAPSHOT_ACCEPT_TIMEOUT) {
        Ok(Ok(sink)) => {
            info!("snapshot visualizer connected");
            Box::new(sink)
        }
        Ok(Err(err)) => {
            warn!(%err, "snapshot publisher socket failed, continuing without one");
            Box::new(BufferSink::default())
        }
        Err(_timeout) => {
            warn!(
                timeout_secs = SNAPSHOT_ACCEPT_TIMEOUT.as_secs(),
                "no visualizer connected in time, continuing without one"
            );
            Box::new(BufferSink::default())
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let rules = load_rules_config(&args.config)
        .with_context(|| format!("loading rules config {}", args.config.display()))?;
    let runtime = load_runtime_config("wator.toml").context("loading wator.toml")?;

    let total_workers = args.workers.unwrap_or(runtime.total_workers);
    let chron_interval = args.interval.unwrap_or(runtime.chron_interval);
    let chron_delay_us = args
        .delay_ms
        .map(|ms| ms * 1_000)
        .unwrap_or(runtime.chron_delay_us);

    let planet = load_planet(&args.planet)
        .with_context(|| format!("loading planet {}", args.planet.display()))?;

    let params = Params {
        sd: rules.sd,
        sb: rules.sb,
        fb: rules.fb,
        chron_interval,
        chron_delay_us,
        total_workers,
    };
    info!(
        nrow = planet.nrow(),
        ncol = planet.ncol(),
        total_workers,
        chron_interval,
        chron_delay_us,
        "starting simulation"
    );

    let farm = build_farm(planet, params, |chronon| {
        debug!(chronon, "chronon completed");
    })
    .context("failed to build the chronon farm")?;
    let handle = farm.handle();

    let snapshot_sink = open_snapshot_sink(&args.publish_addr);
    let checkpoint_sink: Box<dyn CheckpointSink> =
        Box::new(FileCheckpointSink::new(args.checkpoint.clone()));

    {
        let handle = handle.clone();
        thread::spawn(move || loop {
            thread::sleep(CHECKPOINT_INTERVAL);
            handle.request_checkpoint();
        });
    }

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGALRM, SIGUSR1]).context("installing signal handlers")?;
    {
        let handle = handle.clone();
        thread::spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGINT | SIGTERM => {
                        info!(signal, "shutdown requested");
                        handle.request_shutdown();
                        break;
                    }
                    SIGALRM | SIGUSR1 => {
                        info!(signal, "checkpoint requested");
                        handle.request_checkpoint();
                    }
                    _ => {}
                }
            }
        });
    }

    farm.run(snapshot_sink, checkpoint_sink);
    info!(chronon = handle.chronon(), "simulation terminated");
    Ok(())
}

fn main() -> Result<()> {
    let _log_guard = configure_logging()?;
    if let Err(err) = run() {
        tracing::error!(%err, "fatal startup error");
        eprintln!("wator: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
