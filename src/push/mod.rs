//! Device push-token lifecycle.
//!
//! The platform integration hands us a push token (or we mint a dev
//! placeholder when no push provider is wired up); this module registers it
//! with the backend after login, re-registers on token refresh, and
//! unregisters on logout. Every backend call is fire-and-forget: a screen
//! reacting to a login must never wait on a token round-trip.

use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use log::{info, warn};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::auth::{AuthStore, AuthSubscription};

pub struct TokenManager {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
    device_token: Mutex<Option<String>>,
    auth_sub: Mutex<Option<AuthSubscription>>,
}

impl TokenManager {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        Self { api, auth, device_token: Mutex::new(None), auth_sub: Mutex::new(None) }
    }

    /// Follow auth transitions: a login registers the device token in the
    /// background and a logout unregisters it. Must be called from within a
    /// tokio runtime since the edges spawn backend calls.
    pub fn watch_auth(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let sub = self.auth.subscribe(Arc::new(move |prev, next| {
            let Some(manager) = weak.upgrade() else { return };
            if prev.user.is_none() && next.user.is_some() {
                manager.register_in_background();
            } else if prev.user.is_some() && next.user.is_none() {
                manager.unregister_in_background();
            }
        }));
        *self.auth_sub.lock().unwrap() = Some(sub);
    }

    /// Record the platform-issued push token.
    pub fn set_device_token(&self, token: String) {
        *self.device_token.lock().unwrap() = Some(token);
    }

    pub fn device_token(&self) -> Option<String> {
        self.device_token.lock().unwrap().clone()
    }

    /// Current token, minting a dev placeholder when no push provider has
    /// supplied one. Placeholder tokens keep the registration flow testable
    /// in environments without FCM.
    pub fn ensure_device_token(&self) -> String {
        let mut token = self.device_token.lock().unwrap();
        token.get_or_insert_with(|| format!("DEV_TOKEN_{}", Uuid::new_v4())).clone()
    }

    /// Register the device token for the logged-in user. Errors propagate so
    /// the background wrapper can log them; there is no retry.
    pub async fn register_for_current_user(&self) -> Result<()> {
        let Some(user) = self.auth.current_user() else {
            bail!("no logged-in user to register a device token for");
        };
        let token = self.ensure_device_token();
        self.api.register_device_token(&token).await?;
        info!("registered device token for {} ({})", user.id, user.role.as_wire());
        Ok(())
    }

    /// Fire-and-forget registration; failures are logged and swallowed.
    pub fn register_in_background(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = manager.register_for_current_user().await {
                warn!("device token registration failed: {err:#}");
            }
        });
    }

    /// Unregister the current token, typically on logout. A manager that
    /// never held a token has nothing to tell the backend.
    pub async fn unregister(&self) -> Result<()> {
        let Some(token) = self.device_token() else { return Ok(()) };
        self.api.unregister_device_token(&token).await?;
        info!("unregistered device token");
        Ok(())
    }

    /// Fire-and-forget unregistration; failures are logged and swallowed.
    pub fn unregister_in_background(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = manager.unregister().await {
                warn!("device token unregistration failed: {err:#}");
            }
        });
    }

    /// Handle a push-provider token refresh: adopt the new token and, if a
    /// user is logged in, re-register it with the backend.
    pub fn handle_token_refresh(self: &Arc<Self>, new_token: String) {
        self.set_device_token(new_token);
        if self.auth.current_user().is_some() {
            self.register_in_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        let auth = Arc::new(AuthStore::in_memory());
        let api = Arc::new(ApiClient::new("http://localhost:8000".into(), auth.clone()).unwrap());
        TokenManager::new(api, auth)
    }

    #[test]
    fn ensure_mints_a_dev_placeholder_once() {
        let manager = manager();
        let first = manager.ensure_device_token();
        assert!(first.starts_with("DEV_TOKEN_"));
        assert_eq!(manager.ensure_device_token(), first);
    }

    #[test]
    fn platform_token_wins_over_placeholder() {
        let manager = manager();
        manager.set_device_token("fcm-abc".into());
        assert_eq!(manager.ensure_device_token(), "fcm-abc");
    }

    #[tokio::test]
    async fn registration_requires_a_user() {
        let manager = manager();
        assert!(manager.register_for_current_user().await.is_err());
    }
}
