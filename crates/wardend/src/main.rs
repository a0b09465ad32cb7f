//! wardend - The warden reconciliation daemon
//!
//! Wires the pieces together: configuration, the fleet-backed simulation
//! provider, and the reconciliation engine. Runs one pass per interval (or a
//! single pass with `--once`), prints a report per pass, and shuts down
//! cleanly on SIGTERM/SIGINT.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warden_cloud::{load_fleet, CloudProvider};
use warden_config::{load_config, Config};
use warden_core::Reconciler;
use warden_util::{default_config_path, INSTANT_FORMAT};

/// wardend - Schedule-driven power reconciliation for machine fleets
#[derive(Parser, Debug)]
#[command(name = "wardend")]
#[command(about = "Schedule-driven power reconciliation for machine fleets", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/warden/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Fleet file override (or set WARDEN_FLEET env var)
    #[arg(short, long, env = "WARDEN_FLEET")]
    fleet: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Evaluate decisions without issuing power commands
    #[arg(long)]
    dry_run: bool,

    /// Evaluate one pass at this instant (YYYY-MM-DD HH:MM:SS) and exit
    #[arg(long)]
    at: Option<String>,

    /// Emit pass reports as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

struct Daemon {
    reconciler: Reconciler,
    config: Config,
    json: bool,
}

impl Daemon {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration, falling back to defaults when the default
        // config path does not exist. An explicitly given path must exist.
        let config = if args.config.exists() {
            let config = load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?;
            info!(config_path = %args.config.display(), "Configuration loaded");
            config
        } else if args.config == default_config_path() {
            info!("No config file found, using defaults");
            Config::default()
        } else {
            bail!("Config file not found: {:?}", args.config);
        };

        let Some(fleet_path) = args.fleet.clone().or_else(|| config.fleet_path.clone()) else {
            bail!("No fleet file given (use --fleet or set fleet.path in the config)");
        };

        let cloud = load_fleet(&fleet_path)
            .with_context(|| format!("Failed to load fleet from {:?}", fleet_path))?;

        info!(
            fleet_path = %fleet_path.display(),
            machine_count = cloud.machine_count(),
            "Fleet loaded"
        );

        let cloud: Arc<dyn CloudProvider> = Arc::new(cloud);
        let mut reconciler = Reconciler::new(cloud, &config);
        if args.dry_run {
            reconciler = reconciler.with_dry_run(true);
        }

        Ok(Self {
            reconciler,
            config,
            json: args.json,
        })
    }

    async fn run_pass(&self, now: DateTime<Local>) -> Result<()> {
        let report = self.reconciler.run_pass(now).await?;

        if self.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print!("{report}");
        }

        Ok(())
    }

    async fn run(&self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let mut pass_timer = tokio::time::interval(self.config.daemon.interval);

        info!(
            interval_secs = self.config.daemon.interval.as_secs(),
            "Daemon running"
        );

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // First tick fires immediately, so the daemon reconciles on
                // startup rather than waiting a full interval.
                _ = pass_timer.tick() => {
                    if let Err(e) = self.run_pass(warden_util::now()).await {
                        error!(error = %e, "Pass aborted");
                    }
                }
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json {
        // Keep stdout clean for JSON reports; logs go to stderr.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "wardend starting");

    let daemon = Daemon::new(&args)?;

    if let Some(at) = &args.at {
        let Some(now) = warden_util::parse_instant(at) else {
            bail!("Invalid --at instant {at:?} (expected {INSTANT_FORMAT})");
        };
        return daemon.run_pass(now).await;
    }

    if args.once {
        return daemon.run_pass(warden_util::now()).await;
    }

    daemon.run().await
}
