use reqwest::header::LOCATION;
use reqwest::{Client, Url};
use tracing::{debug, info};
use crate::config::{non_blank, Config};
use crate::helpers::errors::ProxyError;
use crate::models::booking::UpstreamReply;

/// Redirect hops followed before the upstream is considered broken.
pub const MAX_REDIRECT_HOPS: usize = 3;

pub struct BookingUpstreamRepo {
    client: Client,
    upstream_url: Option<String>,
    shared_secret: Option<String>,
}

impl BookingUpstreamRepo {
    pub fn new(
        client: Client,
        config: &Config,
    ) -> Self {
        Self {
            client,
            upstream_url: non_blank(&config.gas_book_tour_url).map(str::to_owned),
            shared_secret: non_blank(&config.booking_shared_secret).map(str::to_owned),
        }
    }

    pub fn ensure_configured(&self) -> Result<(), ProxyError> {
        if self.upstream_url.is_none() {
            return Err(ProxyError::MissingConfig("GAS_BOOK_TOUR_URL"));
        }
        if self.shared_secret.is_none() {
            return Err(ProxyError::MissingConfig("BOOKING_SHARED_SECRET"));
        }
        Ok(())
    }

    pub fn shared_secret(&self) -> Result<&str, ProxyError> {
        self.shared_secret
            .as_deref()
            .ok_or(ProxyError::MissingConfig("BOOKING_SHARED_SECRET"))
    }

    /// Posts the booking to the upstream. Redirects are answered by posting the same body
    /// again to the new location, since the upstream write only happens on POST.
    pub async fn forward(
        &self,
        payload: &[(String, String)],
    ) -> Result<UpstreamReply, ProxyError> {
        let upstream_url = self
            .upstream_url
            .as_deref()
            .ok_or(ProxyError::MissingConfig("GAS_BOOK_TOUR_URL"))?;
        let mut target = Url::parse(upstream_url).map_err(|e| ProxyError::InvalidUrl {
            url: upstream_url.to_string(),
            reason: e.to_string(),
        })?;

        for hop in 0..=MAX_REDIRECT_HOPS {
            let response = self
                .client
                .post(target.clone())
                .form(payload)
                .send()
                .await?;
            let status = response.status();

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            match location {
                Some(location) if status.is_redirection() => {
                    let next = target.join(&location).map_err(|e| ProxyError::InvalidUrl {
                        url: location.clone(),
                        reason: e.to_string(),
                    })?;
                    debug!("Booking upstream redirected (hop {}) with status {}", hop + 1, status);
                    target = next;
                }
                _ => {
                    let body = response.text().await?;
                    info!("Booking upstream answered with status {}", status);
                    return Ok(UpstreamReply {
                        status: status.as_u16(),
                        body,
                    });
                }
            }
        }

        Err(ProxyError::TooManyRedirects(MAX_REDIRECT_HOPS))
    }
}
