pub mod story_memory;

pub use story_memory::StoryMemoryClient;

use crate::config::HttpConfig;
use crate::credentials::StoryMemoryCredentials;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// HTTP client configuration for the Story Memory API
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for HttpClientConfig {
    fn from(config: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Performs authenticated JSON requests on behalf of the node.
///
/// Implementations sign every request with the credential type's
/// authentication rule, send `Content-Type: application/json` and fail on
/// non-2xx responses or bodies that are not JSON.
#[async_trait]
pub trait RequestHelper: Send + Sync {
    /// GET `url` and parse the response body as JSON
    async fn get_json(&self, url: &str, credentials: &StoryMemoryCredentials) -> Result<Value>;
}
