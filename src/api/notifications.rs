use anyhow::Result;
use serde_json::{Value, json};

use super::client::ApiClient;

pub const REGISTER_TOKEN_PATH: &str = "/api/notifications/register-token";
pub const UNREGISTER_TOKEN_PATH: &str = "/api/notifications/unregister-token";

impl ApiClient {
    /// Register a device push token for the logged-in user. The backend
    /// identifies the user from the bearer token, so only the device token
    /// travels in the body.
    pub async fn register_device_token(&self, device_token: &str) -> Result<Value> {
        self.post_json(REGISTER_TOKEN_PATH, &json!({ "deviceToken": device_token })).await
    }

    pub async fn unregister_device_token(&self, device_token: &str) -> Result<Value> {
        self.post_json(UNREGISTER_TOKEN_PATH, &json!({ "deviceToken": device_token })).await
    }
}
