use reqwest::Client;
use tracing::{info, warn};
use crate::config::{non_blank, Config};
use crate::helpers::errors::{preview, ProxyError};
use crate::models::place::{PlaceDetails, PLACES_FIELD_MASK};

const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";
pub const ERROR_PREVIEW_CHARS: usize = 2000;

pub struct PlacesRepo {
    client: Client,
    base_url: String,
    place_id: Option<String>,
    api_key: Option<String>,
}

impl PlacesRepo {
    pub fn new(
        client: Client,
        config: &Config,
    ) -> Self {
        Self {
            client,
            base_url: config.places_api_base_url.trim_end_matches('/').to_string(),
            place_id: non_blank(&config.mbw_place_id).map(str::to_owned),
            api_key: non_blank(&config.google_places_api_key).map(str::to_owned),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), ProxyError> {
        let place_id = self
            .place_id
            .as_deref()
            .ok_or(ProxyError::MissingConfig("MBW_PLACE_ID"))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProxyError::MissingConfig("GOOGLE_PLACES_API_KEY"))?;
        Ok((place_id, api_key))
    }

    pub fn ensure_configured(&self) -> Result<(), ProxyError> {
        self.credentials().map(|_| ())
    }

    pub async fn retrieve_place_details(&self) -> Result<PlaceDetails, ProxyError> {
        let (place_id, api_key) = self.credentials()?;

        let mut endpoint = reqwest::Url::parse(&format!("{}/", self.base_url)).map_err(|e| {
            ProxyError::InvalidUrl {
                url: self.base_url.clone(),
                reason: e.to_string(),
            }
        })?;
        endpoint
            .path_segments_mut()
            .map_err(|_| ProxyError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["places", place_id]);

        let response = self
            .client
            .get(endpoint)
            .header(API_KEY_HEADER, api_key)
            .header(FIELD_MASK_HEADER, PLACES_FIELD_MASK)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Places API answered with status {}", status);
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<PlaceDetails>(&body) {
            Ok(details) => {
                info!(
                    "Retrieved place details with {} reviews",
                    details.reviews.len()
                );
                Ok(details)
            }
            Err(e) => {
                warn!("Failed to parse Places API body due to: {}", e);
                Err(ProxyError::Malformed(preview(&body, ERROR_PREVIEW_CHARS)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use super::*;
    use crate::test_support::{spawn_stub, test_client, test_config};

    #[tokio::test]
    async fn sends_key_and_field_mask_and_encodes_place_id() {
        let stub = Router::new().route(
            "/v1/places/:place_id",
            get(|Path(place_id): Path<String>, headers: HeaderMap| async move {
                let api_key = headers["x-goog-api-key"].to_str().unwrap().to_string();
                let rating = if headers["x-goog-fieldmask"] == PLACES_FIELD_MASK { 5.0 } else { 0.0 };
                Json(json!({
                    "displayName": { "text": place_id },
                    "googleMapsUri": api_key,
                    "reviews": [],
                    "rating": rating
                }))
            }),
        );
        let addr = spawn_stub(stub).await;

        let mut config = test_config();
        config.places_api_base_url = format!("http://{addr}/v1/");
        config.mbw_place_id = Some("ChIJ place/1".to_string());
        let details = PlacesRepo::new(test_client(), &config)
            .retrieve_place_details()
            .await
            .unwrap();

        assert_eq!(details.display_name.and_then(|n| n.text).as_deref(), Some("ChIJ place/1"));
        assert_eq!(details.google_maps_uri.as_deref(), Some("places-key"));
        assert_eq!(details.rating, Some(5.0));
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status_and_body() {
        let stub = Router::new().route(
            "/v1/places/:place_id",
            get(|| async {
                (
                    axum::http::StatusCode::FORBIDDEN,
                    r#"{"error": {"code": 403, "status": "PERMISSION_DENIED"}}"#,
                )
            }),
        );
        let addr = spawn_stub(stub).await;

        let mut config = test_config();
        config.places_api_base_url = format!("http://{addr}/v1");
        let err = PlacesRepo::new(test_client(), &config)
            .retrieve_place_details()
            .await
            .unwrap_err();

        match err {
            ProxyError::UpstreamStatus { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("PERMISSION_DENIED"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let mut config = test_config();
        config.google_places_api_key = None;

        assert!(matches!(
            PlacesRepo::new(test_client(), &config).ensure_configured(),
            Err(ProxyError::MissingConfig("GOOGLE_PLACES_API_KEY"))
        ));
    }
}
