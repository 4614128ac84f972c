// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paideia_server::{
    api::router,
    auth::TokenIssuer,
    blacklist_pruner::BlacklistPruner,
    config::{Config, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV},
    providers::{DanaidesClient, S3Client},
    state::AppState,
    storage::{Database, ResponseCache},
};

/// Grace period for in-flight requests on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::from_env()?;
    let db = Database::open(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Database opened");

    let tokens = TokenIssuer::new(&config.jwt_secret, config.access_token_ttl);
    let danaides = DanaidesClient::new(config.danaides_api.clone(), config.http_timeout)?;
    let mut state = AppState::new(db, tokens, danaides)
        .with_cache(ResponseCache::new(config.cache_capacity, config.cache_ttl))
        .with_upload_limit(config.max_upload_bytes);

    match config.s3.clone() {
        Some(s3) => {
            tracing::info!(bucket = %s3.bucket, region = %s3.region, "Object storage enabled");
            let client = S3Client::new(s3, config.http_timeout)?;
            state = state.with_object_store(Arc::new(client), config.upload_key_prefix.clone());
        }
        None => tracing::warn!("S3_BUCKET not set, uploads are disabled"),
    }

    let shutdown = CancellationToken::new();
    let pruner = BlacklistPruner::new(state.db.clone(), config.blacklist_prune_interval);
    let pruner_handle = tokio::spawn(pruner.run(shutdown.clone()));

    let app = router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    match &config.tls {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .map_err(|_| "Failed to install rustls crypto provider")?;
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;

            let handle = Handle::new();
            let signal_handle = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(%addr, "Paideia API listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!(%addr, "Paideia API listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    shutdown.cancel();
    if let Err(e) = pruner_handle.await {
        tracing::warn!(error = %e, "Blacklist pruner task failed");
    }
    tracing::info!("Server stopped");
    Ok(())
}
