use std::sync::Arc;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

pub const MAX_MESSAGE_CHARS: usize = 800;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// HTML document loaded into the booking form's hidden frame. Its only job is to hand
/// the outcome to the parent page, which closes the CAPTCHA frame and shows the result.
#[derive(Clone, Debug)]
pub struct IframeReply {
    namespace: Arc<str>,
    status: ReplyStatus,
    message: String,
}

impl IframeReply {
    pub fn ok(namespace: Arc<str>, message: impl Into<String>) -> Self {
        Self::new(namespace, ReplyStatus::Ok, message)
    }

    pub fn error(namespace: Arc<str>, message: impl Into<String>) -> Self {
        Self::new(namespace, ReplyStatus::Error, message)
    }

    fn new(namespace: Arc<str>, status: ReplyStatus, message: impl Into<String>) -> Self {
        let message = message
            .into()
            .replace(['\r', '\n'], " ")
            .chars()
            .take(MAX_MESSAGE_CHARS)
            .collect();

        Self {
            namespace,
            status,
            message,
        }
    }

    pub fn render(&self) -> String {
        let payload = json!({
            "type": format!("{}-booktour", self.namespace),
            "status": self.status,
            "message": self.message,
        })
        .to_string()
        // no markup character may reach the HTML tokenizer inside the script element
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026");

        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"></head><body>\n\
             <script>\n\
             (function(){{\n  try{{\n    parent.postMessage({}, \"*\");\n  }}catch(e){{}}\n}})();\n\
             </script>\n\
             </body></html>",
            payload
        )
    }
}

impl IntoResponse for IframeReply {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "text/html; charset=utf-8"),
                (CACHE_CONTROL, "no-store"),
            ],
            self.render(),
        )
            .into_response()
    }
}
