//! Client configuration loaded from environment variables.

use chatsync_shared::constants::{DEFAULT_HTTP_PORT, WS_PATH, WS_TOKEN_PARAM};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the server, without a trailing slash.
    /// Env: `CHATSYNC_URL`
    /// Default: `http://127.0.0.1:8080`
    pub base_url: String,

    /// Bearer token issued at signup.
    /// Env: `CHATSYNC_TOKEN` (required)
    pub token: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            token: token.into(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("CHATSYNC_URL")
            .unwrap_or_else(|_| format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"));
        let token = std::env::var("CHATSYNC_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ClientError::Config("CHATSYNC_TOKEN is not set".into()))?;
        Ok(Self::new(base_url, token))
    }

    /// Absolute URL for an API path such as `/api/messages/conversations`.
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// WebSocket push endpoint, carrying the token as a query parameter.
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{base}{WS_PATH}?{WS_TOKEN_PARAM}={}", self.token)
    }
}
