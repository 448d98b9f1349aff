//! vecmetric exporter
//!
//! Standalone exporter process:
//! - Config: YAML file given as first argument, else defaults; env overrides
//! - Scrape endpoint: GET <metric.path> on <metric.port>
//! - Debug mux sharing adds /healthz next to the scrape route
//! - Graceful stop on Ctrl+C / SIGTERM

use axum::routing::get;
use tracing_subscriber::{fmt, EnvFilter};

use vecmetric_core::{Registry, Result};
use vecmetric_exporter::{config, debug_mux, init_from_config, ops};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut cfg = match std::env::args().nth(1) {
        Some(path) => config::load_from_file(&path)?,
        None => config::ExporterConfig::default(),
    };
    cfg.apply_env()?;

    let build_info = Registry::global().gauge_vec(
        "vecmetric_build_info",
        "Build information of the running exporter.",
        &["version"],
    )?;
    build_info.set(1.0, &[env!("CARGO_PKG_VERSION")])?;

    if cfg.debug.share_mux {
        debug_mux().handle("/healthz", get(ops::healthz))?;
    }

    let Some(mut handle) = init_from_config(&cfg)? else {
        tracing::warn!("metric.enable is false, nothing to serve");
        return Ok(());
    };
    let addr = handle.listening().await?;
    tracing::info!(%addr, path = %handle.path(), "vecmetric-exporter ready");

    tokio::select! {
        _ = shutdown_signal() => {}
        state = handle.finished() => {
            tracing::error!(?state, "exporter ended unexpectedly");
        }
    }
    handle.stop().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, stopping exporter");
}
