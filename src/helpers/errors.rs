use thiserror::Error;

/// Failures of the outbound calls made while handling a request. Controllers decide how
/// each one is worded for the caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Server config error: missing {0}.")]
    MissingConfig(&'static str),

    #[error("invalid upstream url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream responded with status {status}")]
    UpstreamStatus { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("upstream redirected more than {0} times")]
    TooManyRedirects(usize),
}

impl ProxyError {
    pub fn is_network(&self) -> bool {
        matches!(self, ProxyError::Network(_))
    }
}

/// Shortens upstream text for logs and error payloads without splitting a character.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Same as [`preview`] but with all whitespace runs collapsed to a single space.
pub fn collapsed_preview(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    preview(&collapsed, max_chars)
}
