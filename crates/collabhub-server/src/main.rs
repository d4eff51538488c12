//! `collabhubd` — standalone websocket server binary for the realtime
//! diagram collaboration engine.
//!
//! This is a thin entry point over `collabhub-session`: it loads
//! configuration, wires up the collaborator aggregate, and runs the TCP
//! accept loop that upgrades connections to websockets and hands them to
//! `ClientConnection::run`. Everything this engine leaves to the deployment
//! (authentication, authorization policy, webhook/add-on delivery, a quota
//! backing store) is wired here to a minimal in-process default suitable for
//! a single-node deployment; an operator who needs the real thing swaps the
//! relevant trait implementation for their own.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod defaults;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tracing::{info, warn};

use collabhub_config::Config;
use collabhub_events::EventBus;
use collabhub_ratelimit::{ApiRateLimiter, InMemoryOrderedSetStore, SlidingWindowRateLimiter};
use collabhub_session::{BackgroundWorkers, Services, SessionHub};
use collabhub_storage::{Database, InMemoryDiagramStore, InMemoryWebhookSubscriptionStore, SurrealDiagramStore, SurrealWebhookSubscriptionStore};
use collabhub_telemetry::{LogConfig, LogFormat};

use defaults::{EphemeralUserDirectory, LoggingEventEmitter, PermissiveAccessChecker, StaticQuotaStore};

/// `collabhubd` — the diagram collaboration engine's websocket server.
#[derive(Parser)]
#[command(name = "collabhubd")]
#[command(author, version, about = "Realtime diagram collaboration websocket server")]
struct Args {
    /// Path to an explicit override config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `server.bind_addr` from the resolved config.
    #[arg(long)]
    bind: Option<String>,

    /// Directory for the embedded `SurrealKV` store. Without this, diagrams
    /// and webhook subscriptions live only in memory for the life of the
    /// process.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Accept every websocket `Origin` unconditionally, overriding
    /// `connection.dev_mode`.
    #[arg(long)]
    dev_mode: bool,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(bind) = &args.bind {
        config.server.bind_addr = bind.clone();
    }
    if args.dev_mode {
        config.connection.dev_mode = true;
    }

    let level = if args.verbose { "debug".to_string() } else { config.telemetry.level.clone() };
    let format = match config.telemetry.format.as_str() {
        "compact" => LogFormat::Compact,
        "json" => LogFormat::Json,
        _ => LogFormat::Pretty,
    };
    let log_config = LogConfig::new(level).with_format(format);
    if let Err(e) = collabhub_telemetry::setup_logging(&log_config) {
        eprintln!("failed to initialize logging: {e}");
    }

    let services = Arc::new(build_services(&config, args.data_dir.as_deref()).await?);
    let hub = Arc::new(SessionHub::new(Arc::clone(&services)));
    let workers = BackgroundWorkers::spawn(Arc::clone(&hub), Arc::clone(&services));

    let bind_addr = config.server.bind_addr.clone();
    let accept_loop = tokio::spawn(transport::run_accept_loop(bind_addr.clone(), Arc::clone(&hub), Arc::clone(&services)));
    let accept_abort = accept_loop.abort_handle();

    println!("{}", format!("collabhubd listening on {bind_addr}").cyan().bold());
    info!(addr = %bind_addr, "collabhubd started");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            accept_abort.abort();
        }
        result = accept_loop => {
            match result {
                Ok(Ok(())) => warn!("accept loop exited unexpectedly"),
                Ok(Err(e)) => warn!(error = %e, "accept loop failed"),
                Err(e) => warn!(error = %e, "accept loop task panicked"),
            }
        }
    }

    drop(workers);
    println!("{}", "collabhubd stopped".green().bold());
    Ok(())
}

async fn build_services(config: &Config, data_dir: Option<&std::path::Path>) -> anyhow::Result<Services> {
    let rate_limit_store = Arc::new(InMemoryOrderedSetStore::new());
    let window = SlidingWindowRateLimiter::new(rate_limit_store, config.rate_limit.key_ttl_padding_secs);
    let rate_limiter = Arc::new(ApiRateLimiter::new(window, Arc::new(StaticQuotaStore::from(&config.rate_limit))));

    let services = match data_dir {
        Some(dir) => {
            let path = dir.to_string_lossy().into_owned();
            info!(path = %path, "opening embedded SurrealKV store");
            let db = Database::connect_embedded(&path).await?;
            Services::new(
                Arc::new(PermissiveAccessChecker),
                Arc::new(SurrealDiagramStore::new(db.clone())),
                Arc::new(LoggingEventEmitter),
                Arc::new(SurrealWebhookSubscriptionStore::new(db)),
                Arc::new(EphemeralUserDirectory::new()),
                rate_limiter,
                EventBus::new(),
                config.clone(),
            )
        },
        None => {
            warn!("no --data-dir given, diagrams and webhook subscriptions are in-memory only");
            Services::new(
                Arc::new(PermissiveAccessChecker),
                Arc::new(InMemoryDiagramStore::new()),
                Arc::new(LoggingEventEmitter),
                Arc::new(InMemoryWebhookSubscriptionStore::new()),
                Arc::new(EphemeralUserDirectory::new()),
                rate_limiter,
                EventBus::new(),
                config.clone(),
            )
        },
    };
    Ok(services)
}
