use reqwest::Client;
use tracing::{debug, warn};
use crate::config::{non_blank, Config};
use crate::helpers::errors::{preview, ProxyError};
use crate::models::turnstile::TurnstileVerdict;

pub struct TurnstileRepo {
    client: Client,
    verify_url: String,
    secret_key: Option<String>,
}

impl TurnstileRepo {
    pub fn new(
        client: Client,
        config: &Config,
    ) -> Self {
        Self {
            client,
            verify_url: config.turnstile_verify_url.clone(),
            secret_key: non_blank(&config.turnstile_secret_key).map(str::to_owned),
        }
    }

    pub fn ensure_configured(&self) -> Result<(), ProxyError> {
        match self.secret_key {
            Some(_) => Ok(()),
            None => Err(ProxyError::MissingConfig("TURNSTILE_SECRET_KEY")),
        }
    }

    /// Asks the siteverify endpoint whether `token` was issued to a real browser.
    pub async fn verify(
        &self,
        token: &str,
        remote_ip: Option<&str>,
    ) -> Result<TurnstileVerdict, ProxyError> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(ProxyError::MissingConfig("TURNSTILE_SECRET_KEY"))?;

        let mut params = vec![("secret", secret_key), ("response", token)];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let response = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<TurnstileVerdict>(&body) {
            Ok(verdict) => {
                debug!("Turnstile answered {} with success={}", status, verdict.success);
                Ok(verdict)
            }
            Err(e) => {
                warn!("Unreadable Turnstile verdict (status {}): {}", status, e);
                Err(ProxyError::Malformed(preview(&body, 200)))
            }
        }
    }
}
