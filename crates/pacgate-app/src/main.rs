//! PacGate - subscription-gated PAC proxy switch.
//!
//! Restores the last proxy state, starts the bridge worker and serves the
//! local API until Ctrl+C.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use directories::ProjectDirs;
use pacgate_core::{
    BackendClient, Bridge, BridgeError, CoreError, Intent, LogIndicator, ProxyController,
    ProxyPlatform, RecordingPlatform, Session, SettingsStore,
};
use pacgate_proxy::SystemProxy;
use pacgate_server::{AppState, Server};
use pacgate_storage::Database;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Args;

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "pacgate", "pacgate").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pacgate={},warn", args.log_level())));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("pacgate")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

async fn run<P: ProxyPlatform>(args: &Args, db: Database, platform: P) -> anyhow::Result<()> {
    let store = Arc::new(db);
    let cached_user = store.load_user().context("Failed to load cached user")?;
    let signed_in = cached_user.is_some();
    let session = Session::new(cached_user);

    let mut controller =
        ProxyController::new(store, platform, LogIndicator::new(), args.upstream())?;

    // Gate the restore on the cached record; the refresh below corrects it.
    let cached = session.subscription(Utc::now());
    match controller.bootstrap(&cached, !args.no_bootstrap_apply) {
        Ok(state) => tracing::info!(%state, "Proxy state restored"),
        // The controller has already fallen back to direct
        Err(e @ CoreError::ConfigurationApply(_)) => {
            tracing::warn!(error = %e, "Could not re-apply proxy, starting disconnected")
        }
        Err(e) => return Err(e).context("Failed to restore proxy state"),
    }

    let backend = Arc::new(BackendClient::new(args.backend_config())?);
    let bridge = Bridge::new(controller, session, backend).spawn();

    if signed_in {
        match bridge.send(Intent::RefreshSubscription).await {
            Ok(_) => tracing::info!("Subscription status refreshed"),
            Err(BridgeError::Core(CoreError::NetworkUnavailable(e))) => {
                tracing::warn!(error = %e, "Backend unreachable, using cached subscription")
            }
            Err(e) => tracing::warn!(error = %e, "Subscription refresh failed"),
        }
    }

    let server = Server::with_state(args.server_config(), AppState::new(bridge))?;
    tracing::info!("API listening on http://{}", server.addr());

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting PacGate...");
    tracing::info!("Args: {:?}", args);

    if args.dry_run {
        tracing::info!("Dry run: OS proxy settings will not be touched");
        let db = Database::in_memory().context("Database error")?;
        run(&args, db, RecordingPlatform::new()).await?;
    } else {
        let db = match &args.db_path {
            Some(path) => Database::with_path(path),
            None => Database::new(),
        }
        .context("Database error")?;
        let platform = SystemProxy::in_data_dir()?;
        run(&args, db, platform).await?;
    }

    tracing::info!("PacGate shutting down");
    Ok(())
}
