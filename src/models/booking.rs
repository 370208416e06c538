use std::time::Duration;
use serde::Deserialize;
use serde_json::Value;
use crate::helpers::errors::collapsed_preview;

pub const HONEYPOT_FIELD: &str = "website";
pub const STARTED_AT_FIELD: &str = "ts_start";
pub const TURNSTILE_TOKEN_FIELD: &str = "cf-turnstile-response";
pub const SHARED_SECRET_FIELD: &str = "proxy_secret";

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Thank you! Your booking request has been received.";
const UPSTREAM_PREVIEW_CHARS: usize = 220;

/// Markers the Apps Script replies have used to say the row was written.
const OK_MARKERS: [&str; 5] = [
    "status:\"ok\"",
    "status:'ok'",
    "\"status\":\"ok\"",
    "\"status\": \"ok\"",
    "status=ok",
];

/// Fields posted by the booking form, in the order the browser sent them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookingSubmission {
    fields: Vec<(String, String)>,
}

/// Result of the checks that run before anything leaves the proxy.
#[derive(Clone, Debug, PartialEq)]
pub enum Screening {
    /// Honeypot was filled in. Reported as success so the bot learns nothing.
    Honeypot,
    TooFast { elapsed_ms: f64 },
    MissingToken,
    Passed { token: String },
}

impl BookingSubmission {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Form render time in epoch milliseconds, ignored when absent, zero or not a number.
    pub fn started_at_ms(&self) -> Option<f64> {
        self.first(STARTED_AT_FIELD)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|ts| ts.is_finite() && *ts != 0.0)
    }

    pub fn screen(&self, now_ms: f64, min_dwell: Duration) -> Screening {
        let honeypot = self.first(HONEYPOT_FIELD).unwrap_or_default();
        if !honeypot.trim().is_empty() {
            return Screening::Honeypot;
        }

        if let Some(started_at) = self.started_at_ms() {
            let elapsed_ms = now_ms - started_at;
            if elapsed_ms < min_dwell.as_millis() as f64 {
                return Screening::TooFast { elapsed_ms };
            }
        }

        match self.first(TURNSTILE_TOKEN_FIELD) {
            Some(token) if !token.is_empty() => Screening::Passed {
                token: token.to_string(),
            },
            _ => Screening::MissingToken,
        }
    }

    /// Drops the anti-bot fields and appends the secret the upstream expects.
    pub fn into_forward_payload(self, shared_secret: &str) -> Vec<(String, String)> {
        let mut payload: Vec<(String, String)> = self
            .fields
            .into_iter()
            .filter(|(key, _)| {
                key != TURNSTILE_TOKEN_FIELD && key != HONEYPOT_FIELD && key != STARTED_AT_FIELD
            })
            .collect();

        payload.push((SHARED_SECRET_FIELD.to_string(), shared_secret.to_string()));
        payload
    }
}

/// Raw answer from the booking upstream after any redirects were followed.
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamReply {
    pub status: u16,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BookingAck {
    Accepted { message: String },
    Rejected { message: String },
}

#[derive(Deserialize, Debug)]
struct JsonAck {
    ok: Option<bool>,
    status: Option<String>,
    message: Option<String>,
}

impl BookingAck {
    pub fn interpret(reply: &UpstreamReply) -> Self {
        if !(200..300).contains(&reply.status) {
            return Self::failed_with_preview(reply);
        }

        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(reply.body.trim()) {
            if let Ok(ack) = serde_json::from_value::<JsonAck>(Value::Object(object)) {
                let accepted = match ack.ok {
                    Some(ok) => ok,
                    None => ack.status.as_deref().map_or(false, |s| s.eq_ignore_ascii_case("ok")),
                };
                let message = ack.message.filter(|m| !m.trim().is_empty());

                return match (accepted, message) {
                    (true, message) => BookingAck::Accepted {
                        message: message.unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_string()),
                    },
                    (false, Some(message)) => BookingAck::Rejected { message },
                    (false, None) => Self::failed_with_preview(reply),
                };
            }
        }

        let trimmed = reply.body.trim();
        let has_marker = trimmed == "ok"
            || trimmed == "OK"
            || OK_MARKERS.iter().any(|marker| reply.body.contains(marker));

        if has_marker {
            BookingAck::Accepted {
                message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            }
        } else {
            Self::failed_with_preview(reply)
        }
    }

    fn failed_with_preview(reply: &UpstreamReply) -> Self {
        BookingAck::Rejected {
            message: format!(
                "Booking failed. Upstream status={}. Response preview: {}",
                reply.status,
                collapsed_preview(&reply.body, UPSTREAM_PREVIEW_CHARS)
            ),
        }
    }
}
