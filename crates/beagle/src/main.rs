//! Beagle DNS server.
//!
//! A recursive resolver: client queries arrive over UDP, are resolved by
//! walking the hierarchy from the root servers, cached under TTL
//! discipline, and answered from cache whenever possible.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use beagle_cache::{CacheConfig, DnsCache};
use beagle_resolver::{Resolver, ResolverConfig, RootServers, TransactionTracker};
use beagle_server::{RateLimitConfig, RateLimiter, ServerConfig, ServerStats, UdpServer};

/// How often the statistics logger reports.
const STATS_INTERVAL: Duration = Duration::from_secs(120);

/// How often stale in-flight transactions are swept.
const TRACKER_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Age at which an in-flight transaction is abandoned.
const TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How often idle rate-limiter clients are swept.
const LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Beagle - a recursive DNS resolver
#[derive(Parser, Debug)]
#[command(name = "beagle", version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short = 'L', long, default_value = "0.0.0.0:2053")]
    listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,
}

/// Parse log level from string.
fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize the tracing subscriber.
fn init_logging(level: Level, json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Periodically logs cache, server, and root-server statistics.
fn spawn_stats_logger(
    cache: Arc<DnsCache>,
    stats: Arc<ServerStats>,
    tracker: Arc<TransactionTracker>,
    limiter: Arc<RateLimiter>,
    resolver: Arc<Resolver>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATS_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let snap = cache.stats().snapshot();
                    info!(
                        hits = snap.hits,
                        misses = snap.misses,
                        hit_rate_pct = snap.hit_rate(),
                        inserts = snap.inserts,
                        evictions = snap.evictions,
                        expirations = snap.expirations,
                        entries = snap.current_entries,
                        ns_hits = snap.ns_hits,
                        ns_inserts = snap.ns_inserts,
                        neg_hits = snap.neg_hits,
                        "cache statistics"
                    );

                    info!(
                        uptime_secs = stats.uptime().as_secs(),
                        queries = stats.queries.load(Ordering::Relaxed),
                        responses = stats.responses.load(Ordering::Relaxed),
                        rate_limited = stats.rate_limited.load(Ordering::Relaxed),
                        parse_errors = stats.parse_errors.load(Ordering::Relaxed),
                        servfails = stats.servfails.load(Ordering::Relaxed),
                        clients = limiter.client_count(),
                        in_flight = tracker.len(),
                        "server statistics"
                    );

                    for root in resolver.roots().iter() {
                        if root.hits() > 0 || root.timeouts() > 0 {
                            info!(
                                root = root.hostname,
                                hits = root.hits(),
                                timeouts = root.timeouts(),
                                avg_latency_ms = root.avg_latency().as_millis() as u64,
                                "root server statistics"
                            );
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Periodically drops transactions whose responses never arrived.
fn spawn_tracker_sweeper(
    tracker: Arc<TransactionTracker>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(TRACKER_SWEEP_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracker.cleanup(TRANSACTION_TIMEOUT);
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

/// Periodically drops idle clients from the rate limiter table.
fn spawn_limiter_sweeper(
    limiter: Arc<RateLimiter>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_SWEEP_INTERVAL);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    limiter.sweep_idle();
                }
                _ = shutdown.recv() => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        cli.log_level
            .as_deref()
            .map(parse_log_level)
            .unwrap_or(Level::INFO)
    };
    init_logging(level, cli.json);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // all state is built here and shared by reference; the shutdown
    // channel is the only process-wide signal
    let cache = Arc::new(DnsCache::new(CacheConfig::default()));
    let tracker = Arc::new(TransactionTracker::new());
    let roots = Arc::new(RootServers::builtin());
    let resolver = Arc::new(Resolver::new(
        ResolverConfig::default(),
        cache.clone(),
        tracker.clone(),
        roots,
    ));
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
    let stats = Arc::new(ServerStats::new());

    let server_config = ServerConfig {
        listen: cli.listen,
        ..ServerConfig::default()
    };
    let workers = server_config.effective_workers();

    let server = UdpServer::bind(
        server_config,
        limiter.clone(),
        resolver.clone(),
        stats.clone(),
    )
    .await
    .with_context(|| format!("failed to bind {}", cli.listen))?;

    info!(
        addr = %server.local_addr(),
        workers,
        "beagle dns server started"
    );

    let background = vec![
        cache.clone().spawn_expirer(shutdown_tx.subscribe()),
        spawn_stats_logger(
            cache.clone(),
            stats.clone(),
            tracker.clone(),
            limiter.clone(),
            resolver.clone(),
            shutdown_tx.subscribe(),
        ),
        spawn_tracker_sweeper(tracker.clone(), shutdown_tx.subscribe()),
        spawn_limiter_sweeper(limiter.clone(), shutdown_tx.subscribe()),
    ];

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }

        let _ = signal_tx.send(());
    });

    server.run(shutdown_tx.subscribe()).await?;

    for handle in background {
        let _ = handle.await;
    }

    let snap = cache.stats().snapshot();
    info!(
        hits = snap.hits,
        misses = snap.misses,
        hit_rate_pct = snap.hit_rate(),
        evictions = snap.evictions,
        expirations = snap.expirations,
        "final cache statistics"
    );
    info!("beagle dns server stopped");

    Ok(())
}
