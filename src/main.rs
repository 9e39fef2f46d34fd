//! Search Gateway
//!
//! A reverse proxy in front of a search cluster.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                 SEARCH GATEWAY                    │
//!                      │                                                   │
//!   Client Request     │  ┌──────────┐   ┌───────────┐   ┌────────────┐    │
//!   ───────────────────┼─▶│ classify │──▶│   auth    │──▶│  validate  │    │
//!                      │  │ cat/op/  │   │ basic +   │   │ indices/op │    │
//!                      │  │ indices  │   │ TTL cache │   │ /category  │    │
//!                      │  └──────────┘   └───────────┘   └─────┬──────┘    │
//!                      │                                       │           │
//!   Client Response    │  ┌──────────┐                  ┌──────▼─────┐     │
//!   ◀──────────────────┼──│ recorder │◀─────────────────│   proxy    │◀────┼── Search
//!                      │  │+X-Search-│                  │  handler   │     │   Cluster
//!                      │  │    Id    │                  └────────────┘     │
//!                      │  └────┬─────┘                                     │
//!                      │       │ enqueue (non-blocking)                    │
//!                      │       ▼                                           │
//!                      │  ┌──────────────────┐    ┌──────────────────┐     │
//!                      │  │ bounded queue +  │───▶│ analytics index  │     │
//!                      │  │ worker pool      │    │ (upsert-merge)   │     │
//!                      │  └──────────────────┘    └──────────────────┘     │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use search_gateway::analytics::{self, AnalyticsStore, RecorderQueue};
use search_gateway::auth::{
    ClusterCredentialStore, CredentialCache, CredentialStore, MemoryCredentialStore,
};
use search_gateway::config::load_config;
use search_gateway::http::{build_client, AppState, GatewayInner, HttpServer, Upstream};
use search_gateway::iplookup::NoGeoIp;
use search_gateway::lifecycle::{wait_for_signal, Shutdown};
use search_gateway::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!("search-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        analytics_enabled = config.analytics.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = build_client();
    let upstream = Upstream::from_config(&config.upstream)?;

    // Inline credentials switch the gateway to the in-memory store.
    let store: Arc<dyn CredentialStore> = if config.auth.has_inline_credentials() {
        tracing::info!(
            users = config.auth.users.len(),
            permissions = config.auth.permissions.len(),
            "using inline credentials"
        );
        Arc::new(MemoryCredentialStore::seed(
            config.auth.users.clone(),
            config.auth.permissions.clone(),
        ))
    } else {
        Arc::new(ClusterCredentialStore::new(
            client.clone(),
            upstream.clone(),
            config.auth.users_index.clone(),
            config.auth.permissions_index.clone(),
        ))
    };
    let credentials =
        CredentialCache::new(store, Duration::from_secs(config.auth.cache_ttl_secs));

    let analytics_store = Arc::new(AnalyticsStore::new(
        client.clone(),
        upstream.clone(),
        config.analytics.index.clone(),
    ));
    if config.analytics.enabled {
        analytics_store.ensure_index().await?;
    }

    let shutdown = Arc::new(Shutdown::new());
    let geoip = Arc::new(NoGeoIp);
    let recorder_queue = RecorderQueue::new(config.analytics.queue_capacity);
    let workers = analytics::spawn_workers(
        recorder_queue.clone(),
        analytics_store.clone(),
        geoip.clone(),
        config.analytics.workers,
        Duration::from_secs(config.analytics.write_timeout_secs),
        &shutdown,
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let state = AppState::new(GatewayInner {
        config,
        upstream,
        client,
        credentials,
        analytics: analytics_store,
        recorder_queue,
        geoip,
    });
    let server = HttpServer::new(state)?;

    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    // Let the analytics workers drain before exiting.
    shutdown.trigger();
    for worker in workers {
        let _ = worker.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
