use std::sync::Arc;
use axum::{Extension, Router};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{json, Value};
use tracing::{debug, warn};
use crate::controller::AppState;
use crate::helpers::errors::{preview, ProxyError};
use crate::helpers::fallbacks::method_not_allowed_handler;
use crate::models::place::ReviewsPayload;
use crate::repositories::places_repo::{PlacesRepo, ERROR_PREVIEW_CHARS};
use crate::repositories::reviews_cache::{CachedReviews, ReviewsCache};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub fn router(app_state: AppState) -> Router {
    let places_repo = Arc::new(PlacesRepo::new(
        app_state.http_client.clone(),
        &app_state.config,
    ));

    Router::new()
        .route(
            "/api/reviews",
            get(retrieve_reviews).fallback(method_not_allowed_handler),
        )
        .route_layer(Extension(places_repo))
        .route_layer(Extension(app_state.reviews_cache))
}

pub async fn retrieve_reviews(
    Extension(places_repo): Extension<Arc<PlacesRepo>>,
    Extension(reviews_cache): Extension<ReviewsCache>,
    uri: Uri,
) -> Response {
    if let Err(e) = places_repo.ensure_configured() {
        warn!("Cannot serve reviews: {}", e);
        return json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({
                "ok": false,
                "error": "Missing MBW_PLACE_ID or GOOGLE_PLACES_API_KEY env vars."
            }),
        );
    }

    let cache_key = uri.to_string();
    if let Some(cached) = reviews_cache.get(&cache_key).await {
        debug!("Serving {} from the reviews cache", cache_key);
        return cached_response(&cached);
    }

    let details = match places_repo.retrieve_place_details().await {
        Ok(details) => details,
        Err(e) => {
            warn!("Something went wrong retrieving reviews due to: {}", e);
            return upstream_error_response(e);
        }
    };

    let payload = ReviewsPayload::from(details);
    let body = match serde_json::to_string_pretty(&payload) {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to serialize reviews payload due to: {}", e);
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "ok": false, "error": "Failed to encode reviews." }),
            );
        }
    };

    let cached = reviews_cache
        .insert(
            cache_key,
            CachedReviews {
                body,
                cache_control: format!(
                    "public, max-age=0, s-maxage={}",
                    reviews_cache.ttl().as_secs()
                ),
            },
        )
        .await;

    cached_response(&cached)
}

fn cached_response(cached: &CachedReviews) -> Response {
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, JSON_CONTENT_TYPE),
            (CACHE_CONTROL, cached.cache_control.as_str()),
        ],
        cached.body.clone(),
    )
        .into_response()
}

fn json_response(status: StatusCode, body: &Value) -> Response {
    let body = serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());

    (
        status,
        [(CONTENT_TYPE, JSON_CONTENT_TYPE), (CACHE_CONTROL, "no-store")],
        body,
    )
        .into_response()
}

/// Failures are proxied as 502 with whatever the upstream told us, and never cached.
fn upstream_error_response(err: ProxyError) -> Response {
    let body = match err {
        ProxyError::UpstreamStatus { status, body } => {
            let detail = serde_json::from_str::<Value>(&body)
                .unwrap_or_else(|_| Value::String(preview(&body, ERROR_PREVIEW_CHARS)));
            json!({
                "ok": false,
                "stage": "google_api_error",
                "http_status": status,
                "body": detail,
            })
        }
        ProxyError::Malformed(detail) => json!({
            "ok": false,
            "stage": "parse_error",
            "detail": detail,
        }),
        ProxyError::Network(e) => json!({
            "ok": false,
            "stage": "network_error",
            "detail": e.to_string(),
        }),
        other => json!({
            "ok": false,
            "stage": "proxy_error",
            "detail": other.to_string(),
        }),
    };

    json_response(StatusCode::BAD_GATEWAY, &body)
}
