use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use log::debug;
use serde_json::Value;

use crate::auth::AuthStore;

/// JSON API client with connection pooling.
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: Arc<AuthStore>,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Arc<AuthStore>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("fuelnet-client/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), auth, http_client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body, attaching the session bearer token when present.
    /// Non-2xx responses become errors carrying status and body.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");

        let mut request = self.http_client.post(&url).json(body);
        if let Some(token) = self.auth.token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            bail!("Request to {url} returned {status}: {text}");
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| format!("Invalid JSON from {url}"))
    }
}
