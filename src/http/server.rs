//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the axum router from plugin routes
//! - Layer the canonical pipeline in its fixed order
//! - Serve with peer-address propagation and graceful shutdown
//!
//! # Design Decisions
//! - Pipeline layers wrap the router FIFO: classification, recorder, auth,
//!   validation, terminal handler
//! - All collaborators live in one application-scope state; no globals

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::analytics::{self, AnalyticsPlugin, AnalyticsStore, RecorderQueue};
use crate::auth::CredentialCache;
use crate::config::GatewayConfig;
use crate::http::proxy::ProxyPlugin;
use crate::http::upstream::{Upstream, UpstreamClient};
use crate::iplookup::GeoIp;
use crate::observability::metrics;
use crate::pipeline::{auth, classify, validate};
use crate::routing::{RouteError, RouteResolver};

/// Application-scope collaborators injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<GatewayInner>,
}

pub struct GatewayInner {
    pub config: GatewayConfig,
    pub upstream: Upstream,
    pub client: UpstreamClient,
    pub credentials: CredentialCache,
    pub analytics: Arc<AnalyticsStore>,
    pub recorder_queue: RecorderQueue,
    pub geoip: Arc<dyn GeoIp>,
}

impl AppState {
    pub fn new(inner: GatewayInner) -> AppState {
        AppState {
            inner: Arc::new(inner),
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Resolve routes and build the middleware stack. Duplicate routes are
    /// a boot error.
    pub fn new(state: AppState) -> Result<HttpServer, RouteError> {
        let router = Self::build_router(state)?;
        Ok(HttpServer { router })
    }

    fn build_router(state: AppState) -> Result<Router, RouteError> {
        let mut resolver = RouteResolver::new();
        resolver.register(&AnalyticsPlugin)?;
        resolver.register(&ProxyPlugin)?;

        let request_timeout = Duration::from_secs(state.inner.config.timeouts.request_secs);

        // Canonical chain; listed order is wrap order, outermost first.
        let router: Router = resolver.into_router().with_state(state.clone());
        let router: Router = router.layer(from_fn(validate::category));
        let router: Router = router.layer(from_fn(validate::operation));
        let router: Router = router.layer(from_fn(validate::indices));
        let router: Router = router.layer(from_fn_with_state::<_, AppState, (
            axum::extract::State<AppState>,
            axum::extract::Request,
        )>(state.clone(), auth::basic_auth));
        let router: Router = router.layer(from_fn_with_state::<_, AppState, (
            axum::extract::State<AppState>,
            axum::extract::Request,
        )>(state.clone(), analytics::recorder::record));
        let router: Router = router.layer(from_fn(classify::indices));
        let router: Router = router.layer(from_fn(classify::operation));
        let router: Router = router.layer(from_fn(classify::category));
        let router: Router = router.layer(from_fn(metrics::track_requests));
        let router: Router = router.layer(TimeoutLayer::new(request_timeout));
        let router: Router = router.layer(TraceLayer::new_for_http());

        Ok(router)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
