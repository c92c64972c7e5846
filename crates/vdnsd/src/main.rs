// # vdnsd - Vercel subdomain DDNS daemon
//
// Thin wiring layer: reconciliation logic lives in vdns-core, I/O in the
// plugin crates.
//
// The daemon is responsible for:
// 1. Loading `.env` (if present) and reading configuration from the environment
// 2. Initializing logging and the runtime
// 3. Building the address resolver, the Vercel provider and the scheduler
// 4. Running until SIGTERM / SIGINT
//
// ## Configuration
//
// ### Required
// - `REFRESH_INTERVAL_SECONDS`: Seconds between reconciliation cycles
// - `SUBDOMAIN`: Record name to manage (e.g. "home")
// - `VERCEL_TOKEN`: Vercel API token
// - `VERCEL_DOMAIN`: Domain the subdomain lives in (e.g. "example.com")
//
// ### Optional
// - `VERCEL_TEAM_ID`, `VERCEL_API_BASE`
// - `VDNS_IPV4_SOURCES`, `VDNS_IPV6_SOURCES`: Comma-separated discovery URLs
// - `VDNS_DISABLE_IPV4`, `VDNS_DISABLE_IPV6`
// - `VDNS_HTTP_TIMEOUT_SECS`, `VDNS_CYCLE_TIMEOUT_SECS`
// - `VDNS_RUN_ON_START`, `VDNS_DRY_RUN`
// - `VDNS_LOG_LEVEL` (overridden by `RUST_LOG`)
//
// ## Example
//
// ```bash
// export REFRESH_INTERVAL_SECONDS=300
// export SUBDOMAIN=home
// export VERCEL_TOKEN=your_token
// export VERCEL_DOMAIN=example.com
//
// vdnsd
// ```

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use vdns_core::{DdnsConfig, DnsProvider, Reconciler, Scheduler, SchedulerEvent};
use vdns_provider_vercel::VercelProvider;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // A missing .env file is not an error
    let dotenv = dotenvy::dotenv();

    let config = match DdnsConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
    {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting vdnsd daemon");
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }
    info!(
        "Managing {}.{} every {}s",
        config.subdomain, config.provider.domain, config.refresh_interval_secs
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let scheduler = match build_scheduler(&config) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(scheduler).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire resolver, provider and reconciler into a scheduler
fn build_scheduler(config: &DdnsConfig) -> Result<(Scheduler, mpsc::Receiver<SchedulerEvent>)> {
    let resolver = vdns_ip_http::resolver_from_config(&config.discovery)
        .context("Failed to build address resolver")?;

    let provider: Arc<dyn DnsProvider> = Arc::new(
        VercelProvider::from_config(&config.provider, config.discovery.http_timeout())
            .context("Failed to create Vercel provider")?,
    );
    info!("DNS provider: {}", provider.provider_name());

    let reconciler = Reconciler::from_config(resolver, provider, config);
    Scheduler::new(reconciler, config).context("Failed to create scheduler")
}

/// Run the scheduler until a shutdown signal arrives
async fn run_daemon(
    (scheduler, mut events): (Scheduler, mpsc::Receiver<SchedulerEvent>),
) -> Result<()> {
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SchedulerEvent::CycleCompleted { report } if report.failure_count() > 0 => {
                    warn!(
                        "Cycle finished with {} failed operation(s)",
                        report.failure_count()
                    );
                }
                other => debug!("Scheduler event: {:?}", other),
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signal_task = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    let result = scheduler.run_with_shutdown(shutdown_rx).await;

    signal_task.abort();
    drop(scheduler);
    let _ = event_task.await;

    result.context("Scheduler failed")?;
    info!("Daemon stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
