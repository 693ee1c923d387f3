use base64::{engine::general_purpose, Engine as _};
use reqwest::{header::AUTHORIZATION, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::config::ReaderConfig;
use crate::shared::AppError;

/// Builds the Basic auth header: the private key is the username and the
/// password is empty
pub fn basic_auth_header(private_key: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{private_key}:"))
    )
}

/// HTTP client for the reader service's unread-room data
pub struct UnreadRoomsClient {
    http: reqwest::Client,
    base_url: Url,
    authorization: String,
}

impl UnreadRoomsClient {
    pub fn new(config: ReaderConfig) -> Result<Self, AppError> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::Configuration(format!("invalid RR_URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Configuration(format!(
                "invalid RR_URL: {} cannot be a base",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            authorization: basic_auth_header(&config.private_key),
        })
    }

    /// `<base_url>/readers/<user_id>`, with the user id escaped as one segment
    fn readers_url(&self, user_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("readers").push(user_id);
        }
        url
    }

    /// Fetches the user's unread-room payload and returns it as generic JSON
    #[instrument(skip(self))]
    pub async fn unread_rooms(&self, user_id: &str) -> Result<Value, AppError> {
        let url = self.readers_url(user_id);
        debug!(url = %url, "Requesting unread rooms");

        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Reader service request failed");
                AppError::UpstreamUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Reader service returned an error status");
            return Err(AppError::UpstreamUnavailable(format!(
                "reader service returned {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, "Failed to read reader service response");
            AppError::UpstreamUnavailable(e.to_string())
        })?;

        let payload = serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Reader service returned malformed JSON");
            AppError::Decode(e.to_string())
        })?;

        debug!("Unread rooms fetched");
        Ok(payload)
    }
}
