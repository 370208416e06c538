//! Shared fixtures for the in-crate tests: stub upstream servers, a fully populated
//! config and helpers to read the iframe reply.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;
use axum::Router;
use serde_json::Value;
use crate::config::{Config, DEFAULT_PLACES_API_BASE_URL, DEFAULT_TURNSTILE_VERIFY_URL};
use crate::controller::{application, build_http_client, AppState};

pub fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        origin_urls: None,
        turnstile_secret_key: Some("turnstile-secret".to_string()),
        turnstile_verify_url: DEFAULT_TURNSTILE_VERIFY_URL.to_string(),
        gas_book_tour_url: Some("http://127.0.0.1:1/exec".to_string()),
        booking_shared_secret: Some("shared-secret".to_string()),
        booking_message_namespace: "mbw".to_string(),
        min_dwell_ms: 4000,
        mbw_place_id: Some("ChIJmindo".to_string()),
        google_places_api_key: Some("places-key".to_string()),
        places_api_base_url: DEFAULT_PLACES_API_BASE_URL.to_string(),
        reviews_cache_ttl_secs: 21600,
        outbound_timeout_secs: 5,
        max_concurrent_requests: 64,
    }
}

pub fn test_client() -> reqwest::Client {
    build_http_client(Duration::from_secs(5)).unwrap()
}

/// Serves `router` on an ephemeral localhost port for the rest of the test.
pub async fn spawn_stub(router: Router) -> SocketAddr {
    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(router.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);
    addr
}

pub async fn spawn_app(config: Config) -> SocketAddr {
    spawn_app_with_state(AppState::new(config).unwrap()).await
}

pub async fn spawn_app_with_state(state: AppState) -> SocketAddr {
    spawn_stub(application(state)).await
}

/// A localhost port nothing is listening on.
pub fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Pulls the object handed to `parent.postMessage` out of an iframe reply.
pub fn extract_post_message(html: &str) -> Value {
    let start = html
        .find("parent.postMessage(")
        .map(|i| i + "parent.postMessage(".len())
        .expect("reply has no postMessage call");
    let end = html[start..]
        .rfind(", \"*\")")
        .map(|i| start + i)
        .expect("postMessage call is not closed");

    serde_json::from_str(&html[start..end]).expect("postMessage payload is not JSON")
}
