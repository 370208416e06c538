use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use crate::config::Config;
use crate::helpers::fallbacks::page_not_found_handler;
use crate::repositories::reviews_cache::ReviewsCache;

pub mod booking_controller;
pub mod health_check;
pub mod reviews_controller;

/// Everything the controllers share. Cheap to clone: the client and cache are handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
    pub reviews_cache: ReviewsCache,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = build_http_client(Duration::from_secs(config.outbound_timeout_secs))?;
        let reviews_cache = ReviewsCache::new(Duration::from_secs(config.reviews_cache_ttl_secs));

        Ok(Self {
            config: Arc::new(config),
            http_client,
            reviews_cache,
        })
    }
}

/// Outbound client shared by every repository. Redirects are never followed automatically;
/// the booking forwarder re-posts them itself.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to build the outbound HTTP client")
}

pub async fn serve(
    config: Config,
) -> anyhow::Result<()> {
    let port: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HOST and PORT do not form a valid socket address")?;
    let app_state = AppState::new(config)?;

    info!("API server listening on port: {}", port);
    axum::Server::bind(&port)
        .serve(application(app_state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Error spinning up the API server")
}

pub fn application(app_state: AppState) -> Router {
    let config = app_state.config.clone();
    let mut application = router_endpoints(app_state).fallback(page_not_found_handler);

    if let Some(cors) = cors_layer(&config) {
        application = application.layer(cors);
    }

    application.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(GlobalConcurrencyLimitLayer::new(config.max_concurrent_requests)),
    )
}

pub fn router_endpoints(app_state: AppState) -> Router {
    health_check::router()
        .merge(booking_controller::router(app_state.clone()))
        .merge(reviews_controller::router(app_state))
}

fn cors_layer(config: &Config) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .origin_urls
        .as_deref()?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!("Ignoring CORS origin {} due to: {}", s, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_origin(origins)
            .allow_headers([CONTENT_TYPE]),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c due to: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM due to: {}", e);
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

    info!("Shutdown signal received, draining in-flight requests");
}
