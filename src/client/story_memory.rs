use super::{HttpClientConfig, RequestHelper};
use crate::credentials::{StoryMemoryApi, StoryMemoryCredentials};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error, instrument};

const MAX_ERROR_BODY_CHARS: usize = 200;

/// reqwest-backed request helper for the Story Memory API
#[derive(Debug, Clone)]
pub struct StoryMemoryClient {
    http_client: Client,
    credential_type: StoryMemoryApi,
}

impl StoryMemoryClient {
    /// Create a new client with the given configuration
    pub fn new(config: &HttpClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::invalid_input("http", format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            credential_type: StoryMemoryApi,
        })
    }
}

#[async_trait]
impl RequestHelper for StoryMemoryClient {
    #[instrument(skip(self, credentials))]
    async fn get_json(&self, url: &str, credentials: &StoryMemoryCredentials) -> Result<Value> {
        let mut request = self
            .http_client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        for (name, value) in self.credential_type.authenticate(credentials) {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| {
            error!("Story Memory request failed: {}", e);
            Error::Http(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Story Memory responded {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let message = error_message(status, &body);
            return Err(if status == StatusCode::UNAUTHORIZED {
                Error::AuthenticationFailed(message)
            } else {
                Error::Api {
                    code: status.as_u16(),
                    message,
                }
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Pick the most useful message out of an error response.
///
/// The API reports failures as `{"detail": "..."}`; other bodies are
/// truncated, empty ones fall back to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(detail)) = map.get("detail") {
            return detail.clone();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .map_or_else(|| status.to_string(), ToString::to_string);
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(StoryMemoryClient::new(&HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn test_error_message_prefers_detail() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, r#"{"detail": "Child not found"}"#),
            "Child not found"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "  "), "Bad Gateway");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
    }

    #[test]
    fn test_error_message_truncates_long_bodies() {
        let body = "x".repeat(1000);
        assert_eq!(error_message(StatusCode::INTERNAL_SERVER_ERROR, &body).len(), 200);
    }
}
