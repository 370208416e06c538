use clap::Parser;
use tracing::warn;

pub const DEFAULT_TURNSTILE_VERIFY_URL: &str =
    "https://challenges.cloudflare.com/turnstile/v0/siteverify";
pub const DEFAULT_PLACES_API_BASE_URL: &str = "https://places.googleapis.com/v1";

#[derive(Parser, Clone, Debug)]
pub struct Config {
    #[clap(env, long, default_value = "development")]
    pub environment: String,

    #[clap(env, long, default_value = "127.0.0.1")]
    pub host: String,

    #[clap(env, long, default_value_t = 3000)]
    pub port: u16,

    /// Comma separated list of origins allowed to call the API from a browser.
    #[clap(env, long)]
    pub origin_urls: Option<String>,

    #[clap(env, long, hide_env_values = true)]
    pub turnstile_secret_key: Option<String>,

    #[clap(env, long, default_value = DEFAULT_TURNSTILE_VERIFY_URL)]
    pub turnstile_verify_url: String,

    /// Apps Script web app that records the booking.
    #[clap(env, long)]
    pub gas_book_tour_url: Option<String>,

    /// Sent along with every forwarded booking so the upstream can reject direct posts.
    #[clap(env, long, hide_env_values = true)]
    pub booking_shared_secret: Option<String>,

    #[clap(env, long, default_value = "mbw")]
    pub booking_message_namespace: String,

    #[clap(env, long, default_value_t = 4000)]
    pub min_dwell_ms: u64,

    #[clap(env, long)]
    pub mbw_place_id: Option<String>,

    #[clap(env, long, hide_env_values = true)]
    pub google_places_api_key: Option<String>,

    #[clap(env, long, default_value = DEFAULT_PLACES_API_BASE_URL)]
    pub places_api_base_url: String,

    #[clap(env, long, default_value_t = 21600)]
    pub reviews_cache_ttl_secs: u64,

    #[clap(env, long, default_value_t = 10)]
    pub outbound_timeout_secs: u64,

    #[clap(env, long, default_value_t = 256)]
    pub max_concurrent_requests: usize,
}

impl Config {
    /// Logs every secret the endpoints need but that was not provided. The server still
    /// starts; the affected endpoint reports the problem on each request instead.
    pub fn warn_missing_secrets(&self) {
        let required = [
            ("TURNSTILE_SECRET_KEY", &self.turnstile_secret_key),
            ("GAS_BOOK_TOUR_URL", &self.gas_book_tour_url),
            ("BOOKING_SHARED_SECRET", &self.booking_shared_secret),
            ("MBW_PLACE_ID", &self.mbw_place_id),
            ("GOOGLE_PLACES_API_KEY", &self.google_places_api_key),
        ];

        for (name, value) in required {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                warn!("{} is not set, dependent endpoint will answer with a config error", name);
            }
        }
    }
}

/// Returns the value only when it is present and not blank.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
