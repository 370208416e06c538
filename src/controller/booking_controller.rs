use std::sync::Arc;
use std::time::Duration;
use axum::{async_trait, Extension, Form, Router};
use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use crate::config::Config;
use crate::controller::AppState;
use crate::helpers::errors::ProxyError;
use crate::helpers::fallbacks::method_not_allowed_handler;
use crate::helpers::iframe_reply::IframeReply;
use crate::models::booking::{BookingAck, BookingSubmission, Screening};
use crate::repositories::booking_repo::BookingUpstreamRepo;
use crate::repositories::turnstile_repo::TurnstileRepo;

const GENERIC_FAILURE_MESSAGE: &str = "Booking failed. Please try again.";

pub fn router(app_state: AppState) -> Router {
    let turnstile_repo = Arc::new(TurnstileRepo::new(
        app_state.http_client.clone(),
        &app_state.config,
    ));
    let booking_repo = Arc::new(BookingUpstreamRepo::new(
        app_state.http_client.clone(),
        &app_state.config,
    ));
    let settings = Arc::new(BookingSettings::from_config(&app_state.config));

    Router::new()
        .route(
            "/api/book-tour",
            post(submit_booking).fallback(method_not_allowed_handler),
        )
        .route_layer(Extension(turnstile_repo))
        .route_layer(Extension(booking_repo))
        .route_layer(Extension(settings))
}

pub struct BookingSettings {
    pub namespace: Arc<str>,
    pub min_dwell: Duration,
}

impl BookingSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: Arc::from(config.booking_message_namespace.as_str()),
            min_dwell: Duration::from_millis(config.min_dwell_ms),
        }
    }

    fn ok(&self, message: impl Into<String>) -> IframeReply {
        IframeReply::ok(self.namespace.clone(), message)
    }

    fn error(&self, message: impl Into<String>) -> IframeReply {
        IframeReply::error(self.namespace.clone(), message)
    }
}

#[derive(Debug, Error)]
pub enum BookingFormRejection {
    #[error("Invalid submission.")]
    UnsupportedContentType,
    #[error("Invalid form data.")]
    Unreadable(String),
}

impl IntoResponse for BookingFormRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Booking form body, accepted as urlencoded or multipart. File parts are dropped.
pub struct BookingForm(pub BookingSubmission);

#[async_trait]
impl<S> FromRequest<S, Body> for BookingForm
where
    S: Send + Sync,
{
    type Rejection = BookingFormRejection;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| BookingFormRejection::Unreadable(e.to_string()))?;
            return Ok(BookingForm(BookingSubmission::new(fields)));
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| BookingFormRejection::Unreadable(e.to_string()))?;

            let mut fields = Vec::new();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| BookingFormRejection::Unreadable(e.to_string()))?
            {
                if field.file_name().is_some() {
                    continue;
                }
                let Some(name) = field.name().map(str::to_owned) else {
                    continue;
                };
                let value = field
                    .text()
                    .await
                    .map_err(|e| BookingFormRejection::Unreadable(e.to_string()))?;
                fields.push((name, value));
            }
            return Ok(BookingForm(BookingSubmission::new(fields)));
        }

        Err(BookingFormRejection::UnsupportedContentType)
    }
}

fn now_ms() -> f64 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1_000_000.0
}

/// Client address as reported by the edge in front of us.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    header("cf-connecting-ip").or_else(|| header("x-forwarded-for"))
}

pub async fn submit_booking(
    Extension(settings): Extension<Arc<BookingSettings>>,
    Extension(turnstile_repo): Extension<Arc<TurnstileRepo>>,
    Extension(booking_repo): Extension<Arc<BookingUpstreamRepo>>,
    headers: HeaderMap,
    submission: Result<BookingForm, BookingFormRejection>,
) -> IframeReply {
    if let Err(e) = turnstile_repo
        .ensure_configured()
        .and_then(|_| booking_repo.ensure_configured())
    {
        warn!("Refusing booking: {}", e);
        return settings.error(e.to_string());
    }

    let submission = match submission {
        Ok(BookingForm(submission)) => submission,
        Err(rejection) => {
            warn!("Unreadable booking submission: {:?}", rejection);
            return settings.error(rejection.to_string());
        }
    };

    let token = match submission.screen(now_ms(), settings.min_dwell) {
        Screening::Honeypot => {
            info!("Honeypot field filled in, answering as if the booking went through");
            return settings.ok("");
        }
        Screening::TooFast { elapsed_ms } => {
            info!("Booking submitted {:.0}ms after render, rejecting", elapsed_ms);
            return settings.error("Please slow down and try again.");
        }
        Screening::MissingToken => {
            return settings.error("Security check failed. Please refresh and try again.");
        }
        Screening::Passed { token } => token,
    };

    let remote_ip = client_ip(&headers);
    match turnstile_repo.verify(&token, remote_ip.as_deref()).await {
        Ok(verdict) if verdict.success => {}
        Ok(verdict) => {
            warn!("Turnstile rejected booking token with codes {:?}", verdict.error_codes);
            return settings.error(verdict.failure_message());
        }
        Err(e) => {
            warn!("Turnstile verification could not complete due to: {}", e);
            return settings.error("Security service unreachable. Please try again.");
        }
    }

    let shared_secret = match booking_repo.shared_secret() {
        Ok(secret) => secret,
        Err(e) => return settings.error(e.to_string()),
    };
    let payload = submission.into_forward_payload(shared_secret);

    let upstream_reply = match booking_repo.forward(&payload).await {
        Ok(reply) => reply,
        Err(e) if e.is_network() => {
            warn!("Booking upstream unreachable due to: {}", e);
            return settings.error("Booking service unreachable (fetch failed).");
        }
        Err(e @ ProxyError::MissingConfig(_)) => {
            warn!("Refusing booking: {}", e);
            return settings.error(e.to_string());
        }
        Err(e) => {
            warn!("Something went wrong forwarding booking due to: {}", e);
            return settings.error(GENERIC_FAILURE_MESSAGE);
        }
    };

    match BookingAck::interpret(&upstream_reply) {
        BookingAck::Accepted { message } => {
            info!("Booking recorded by upstream");
            settings.ok(message)
        }
        BookingAck::Rejected { message } => {
            warn!("Booking upstream did not confirm (status {})", upstream_reply.status);
            settings.error(message)
        }
    }
}
