//! Story Memory API credential type.
//!
//! Declares the stored secret fields, the header rule used to sign every
//! outgoing request and the health-check rule used to validate a credential.

use crate::client::RequestHelper;
use crate::config::CredentialsConfig;
use crate::node::description::NodeProperty;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

pub const CREDENTIAL_NAME: &str = "storyMemoryApi";
pub const DEFAULT_BASE_URL: &str = "https://jackskehan.tech/storyAPI";
pub const HEALTH_PATH: &str = "/health";

/// Resolved credential record
#[derive(Clone, PartialEq, Eq)]
pub struct StoryMemoryCredentials {
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCredentials {
    // absent and null are both "not set"
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
}

impl StoryMemoryCredentials {
    /// Build a credential record. An empty base URL falls back to the
    /// production default; an empty API key is rejected.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::invalid_input("apiKey", "API key cannot be empty"));
        }

        let base_url = base_url.into();
        let base_url = match base_url.trim().trim_end_matches('/') {
            "" => DEFAULT_BASE_URL.to_string(),
            trimmed => trimmed.to_string(),
        };

        Ok(Self { api_key, base_url })
    }

    /// Parse the `{apiKey, baseUrl}` record handed over by the host
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawCredentials = serde_json::from_value(value)?;
        Self::new(raw.api_key.unwrap_or_default(), raw.base_url.unwrap_or_default())
    }

    pub fn from_config(config: &CredentialsConfig) -> Result<Self> {
        Self::new(config.api_key.clone(), config.base_url.clone())
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "apiKey": self.api_key, "baseUrl": self.base_url })
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "apiKey" => Some(&self.api_key),
            "baseUrl" => Some(&self.base_url),
            _ => None,
        }
    }
}

impl std::fmt::Debug for StoryMemoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryMemoryCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Expand a `={{$credentials.<field>}}` template against a credential record
fn render_template(template: &str, credentials: &StoryMemoryCredentials) -> String {
    let mut rendered = template.strip_prefix('=').unwrap_or(template).to_string();
    for field in ["apiKey", "baseUrl"] {
        if let Some(value) = credentials.field(field) {
            rendered = rendered.replace(&format!("{{{{$credentials.{field}}}}}"), value);
        }
    }
    rendered
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateProperties {
    pub headers: BTreeMap<String, String>,
}

/// Generic authentication rule: headers rendered from credential fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateRule {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: AuthenticateProperties,
}

impl AuthenticateRule {
    /// Headers to attach to a request signed with `credentials`
    #[must_use]
    pub fn headers(&self, credentials: &StoryMemoryCredentials) -> Vec<(String, String)> {
        self.properties
            .headers
            .iter()
            .map(|(name, template)| (name.clone(), render_template(template, credentials)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub url: String,
    pub method: String,
}

/// Rule a health response must satisfy for the credential to be valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "properties", rename_all = "camelCase")]
pub enum TestRule {
    /// The JSON body must hold `value` under `key`
    ResponseSuccessBody { key: String, value: String },
}

impl TestRule {
    pub fn evaluate(&self, body: &Value) -> std::result::Result<(), String> {
        match self {
            Self::ResponseSuccessBody { key, value } => match body.get(key) {
                Some(Value::String(actual)) if actual == value => Ok(()),
                Some(actual) => Err(format!("expected '{key}' to be '{value}', got {actual}")),
                None => Err(format!("response has no '{key}' field")),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialTestRequest {
    pub request: TestRequest,
    pub rules: Vec<TestRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypeDescription {
    pub name: String,
    pub display_name: String,
    pub documentation_url: String,
    pub properties: Vec<NodeProperty>,
    pub authenticate: AuthenticateRule,
    pub test: CredentialTestRequest,
}

/// Outcome of validating a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Invalid { reason: String },
}

#[derive(Debug, Clone)]
pub struct CredentialTestResult {
    pub status: CredentialStatus,
    pub duration: Duration,
    pub details: HashMap<String, String>,
}

impl CredentialTestResult {
    #[must_use]
    pub fn new(status: CredentialStatus, duration: Duration) -> Self {
        Self {
            status,
            duration,
            details: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self.status, CredentialStatus::Valid)
    }

    pub fn into_result(self) -> Result<()> {
        match self.status {
            CredentialStatus::Valid => Ok(()),
            CredentialStatus::Invalid { reason } => Err(Error::CredentialTest(reason)),
        }
    }
}

/// The `storyMemoryApi` credential type
#[derive(Debug, Clone, Default)]
pub struct StoryMemoryApi;

impl StoryMemoryApi {
    #[must_use]
    pub fn description(&self) -> CredentialTypeDescription {
        CredentialTypeDescription {
            name: CREDENTIAL_NAME.to_string(),
            display_name: "Story Memory API".to_string(),
            documentation_url: DEFAULT_BASE_URL.to_string(),
            properties: vec![
                NodeProperty::string("API Key", "apiKey", "")
                    .password()
                    .required()
                    .describe("Your Story Memory API key for authentication"),
                NodeProperty::string("Base URL", "baseUrl", DEFAULT_BASE_URL)
                    .required()
                    .describe("The base URL of your Story Memory API instance"),
            ],
            authenticate: self.authenticate_rule(),
            test: CredentialTestRequest {
                request: TestRequest {
                    base_url: "={{$credentials.baseUrl}}".to_string(),
                    url: HEALTH_PATH.to_string(),
                    method: "GET".to_string(),
                },
                rules: vec![TestRule::ResponseSuccessBody {
                    key: "status".to_string(),
                    value: "healthy".to_string(),
                }],
            },
        }
    }

    #[must_use]
    pub fn authenticate_rule(&self) -> AuthenticateRule {
        AuthenticateRule {
            kind: "generic".to_string(),
            properties: AuthenticateProperties {
                headers: BTreeMap::from([(
                    "Authorization".to_string(),
                    "=Bearer {{$credentials.apiKey}}".to_string(),
                )]),
            },
        }
    }

    /// Headers signing a request made with `credentials`
    #[must_use]
    pub fn authenticate(&self, credentials: &StoryMemoryCredentials) -> Vec<(String, String)> {
        self.authenticate_rule().headers(credentials)
    }

    /// Validate a credential against the API's health endpoint
    #[instrument(skip(self, helper, credentials), fields(base_url = %credentials.base_url()))]
    pub async fn test(
        &self,
        helper: &dyn RequestHelper,
        credentials: &StoryMemoryCredentials,
    ) -> CredentialTestResult {
        let start_time = Instant::now();
        let description = self.description();
        let url = format!("{}{}", credentials.base_url(), description.test.request.url);
        debug!("Testing Story Memory credential against {}", url);

        let body = match helper.get_json(&url, credentials).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Credential test request failed: {}", e);
                return CredentialTestResult::new(
                    CredentialStatus::Invalid {
                        reason: e.to_string(),
                    },
                    start_time.elapsed(),
                )
                .with_detail("url", url);
            }
        };

        let verdict = description
            .test
            .rules
            .iter()
            .try_for_each(|rule| rule.evaluate(&body));
        let duration = start_time.elapsed();

        match verdict {
            Ok(()) => {
                info!("Story Memory credential is valid ({:?})", duration);
                CredentialTestResult::new(CredentialStatus::Valid, duration).with_detail("url", url)
            }
            Err(reason) => {
                warn!("Story Memory credential rejected: {}", reason);
                CredentialTestResult::new(CredentialStatus::Invalid { reason }, duration)
                    .with_detail("url", url)
                    .with_detail("body", body.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> StoryMemoryCredentials {
        StoryMemoryCredentials::new("key-123", "http://localhost:8000/").unwrap()
    }

    #[test]
    fn test_bearer_header_rendered_from_rule() {
        let headers = StoryMemoryApi.authenticate(&credentials());
        assert_eq!(
            headers,
            vec![("Authorization".to_string(), "Bearer key-123".to_string())]
        );
    }

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(credentials().base_url(), "http://localhost:8000");
        let fallback = StoryMemoryCredentials::new("key", "").unwrap();
        assert_eq!(fallback.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let err = StoryMemoryCredentials::new("  ", DEFAULT_BASE_URL).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "apiKey"));
    }

    #[test]
    fn test_from_host_value() {
        let creds = StoryMemoryCredentials::from_value(json!({
            "apiKey": "abc",
            "baseUrl": "https://stories.example"
        }))
        .unwrap();
        assert_eq!(creds.api_key(), "abc");
        assert_eq!(StoryMemoryCredentials::from_value(creds.to_value()).unwrap(), creds);
    }

    #[test]
    fn test_null_base_url_falls_back_to_default() {
        let creds =
            StoryMemoryCredentials::from_value(json!({"apiKey": "abc", "baseUrl": null})).unwrap();
        assert_eq!(creds.base_url(), DEFAULT_BASE_URL);

        let creds = StoryMemoryCredentials::from_value(json!({"apiKey": "abc"})).unwrap();
        assert_eq!(creds.base_url(), DEFAULT_BASE_URL);

        let err = StoryMemoryCredentials::from_value(json!({"apiKey": null})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "apiKey"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        assert!(!format!("{:?}", credentials()).contains("key-123"));
    }

    #[test]
    fn test_health_rule() {
        let rule = TestRule::ResponseSuccessBody {
            key: "status".into(),
            value: "healthy".into(),
        };
        assert!(rule.evaluate(&json!({"status": "healthy"})).is_ok());
        assert!(rule.evaluate(&json!({"status": "degraded"})).is_err());
        assert!(rule.evaluate(&json!({"ok": true})).is_err());
    }

    #[test]
    fn test_description_shape() {
        let value = serde_json::to_value(StoryMemoryApi.description()).unwrap();
        assert_eq!(value["name"], "storyMemoryApi");
        assert_eq!(value["properties"][0]["typeOptions"]["password"], true);
        assert_eq!(
            value["authenticate"]["properties"]["headers"]["Authorization"],
            "=Bearer {{$credentials.apiKey}}"
        );
        assert_eq!(value["test"]["request"]["baseURL"], "={{$credentials.baseUrl}}");
        assert_eq!(value["test"]["rules"][0]["type"], "responseSuccessBody");
        assert_eq!(value["test"]["rules"][0]["properties"]["value"], "healthy");
    }
}
