// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use event_service_auth::{
    api::router,
    auth::{HttpKeySource, KeyCache, TokenVerifier},
    config::{Config, LogFormat, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    state::AppState,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // An invalid LOG_FORMAT is reported by Config::from_env below
    let log_format = std::env::var(LOG_FORMAT_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    init_tracing(log_format);

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        issuer = %config.issuer_url,
        audience = config.audience.as_deref().unwrap_or("<unset>"),
        clock_skew_secs = config.clock_skew.as_secs(),
        key_refresh_interval_secs = config.key_refresh_interval.map(|i| i.as_secs()),
        "Configuration loaded"
    );

    let source = HttpKeySource::for_issuer(&config.issuer_url, config.skip_tls_verify)?;
    info!(endpoint = source.endpoint(), "Using signing key set endpoint");
    let keys = Arc::new(KeyCache::new(Arc::new(source)));

    match keys.refresh().await {
        Ok(added) => info!(key_count = added, "Signing keys loaded"),
        Err(e) => warn!(
            error = %e,
            "Signing keys unavailable at startup, will fetch on first request"
        ),
    }

    let shutdown = CancellationToken::new();
    let refresher = config.key_refresh_interval.map(|interval| {
        tokio::spawn(keys.clone().run_refresher(interval, shutdown.clone()))
    });

    let mut verifier = TokenVerifier::new(keys, config.issuer_url.as_str())
        .with_leeway(config.clock_skew);
    if let Some(audience) = &config.audience {
        verifier = verifier.with_audience(audience.as_str());
    }

    let app = router(AppState::new(Arc::new(verifier)));

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| {
            error!(bind_address = %bind_address, error = %e, "Failed to bind listener");
            e
        })?;
    info!(
        address = %listener.local_addr()?,
        "Event service auth listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Some(task) = refresher {
        let _ = task.await;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Resolves on SIGINT or SIGTERM and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown"),
            Err(e) => error!(error = %e, "Failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown");
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    shutdown.cancel();
}
