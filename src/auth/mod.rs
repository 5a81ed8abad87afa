//! Authenticated session state.
//!
//! Holds the current user, API token, and permission flags, persists them to
//! the config directory so a restarted client comes back logged in, and
//! notifies subscribers with before/after snapshots on every change. The
//! notification router keys its pending-intent flush off the `no user ->
//! user` edge of those snapshots.

use std::collections::HashMap;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::routing::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

/// Full session snapshot passed to change subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub permissions: HashMap<String, bool>,
}

/// Auth change callback, invoked with `(prev, next)` session snapshots.
pub type AuthListener = Arc<dyn Fn(&Session, &Session) + Send + Sync>;

/// Guard for an auth change subscription; `unsubscribe` removes the
/// listener, dropping the guard leaves it registered.
pub struct AuthSubscription {
    id: u64,
    listeners: Weak<Mutex<Vec<(u64, AuthListener)>>>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().unwrap().retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct AuthStore {
    state: Mutex<Session>,
    listeners: Arc<Mutex<Vec<(u64, AuthListener)>>>,
    next_listener_id: AtomicU64,
    storage_path: Option<PathBuf>,
}

impl AuthStore {
    /// Store backed by `session.toml` in the platform config directory.
    pub fn open() -> Result<Self> {
        let dir = if cfg!(target_os = "linux") {
            dirs::config_dir()
                .context("Failed to get XDG config directory")?
                .join("fuelnet-client")
        } else {
            dirs::home_dir()
                .context("Failed to get home directory")?
                .join(".fuelnet-client")
        };
        Ok(Self::with_storage(dir.join("session.toml")))
    }

    pub fn with_storage(path: PathBuf) -> Self {
        Self {
            state: Mutex::new(Session::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            storage_path: Some(path),
        }
    }

    /// Store with no persistence; used by tests and embedded hosts that
    /// manage their own session storage.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(Session::default()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(0),
            storage_path: None,
        }
    }

    /// Load a persisted session, if one exists. Subscribers see the loaded
    /// session against an empty `prev`, which is exactly the login edge a
    /// cold-started client needs to replay deferred work against.
    pub fn rehydrate(&self) -> Result<bool> {
        let Some(path) = &self.storage_path else { return Ok(false) };
        if !path.exists() {
            debug!("no persisted session at {:?}", path);
            return Ok(false);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {:?}", path))?;
        let session: Session = toml::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {:?}", path))?;

        let prev = {
            let mut state = self.state.lock().unwrap();
            std::mem::replace(&mut *state, session.clone())
        };
        info!(
            "rehydrated session for {:?}",
            session.user.as_ref().map(|u| u.id.as_str())
        );
        self.notify(&prev, &session);
        Ok(session.user.is_some())
    }

    pub fn set_user(&self, user: User, token: Option<String>) {
        let (prev, next) = {
            let mut state = self.state.lock().unwrap();
            let prev = state.clone();
            state.user = Some(user);
            state.token = token;
            (prev, state.clone())
        };
        self.persist(&next);
        self.notify(&prev, &next);
    }

    /// Merge permission flags into the session. Does not touch the user, so
    /// routers listening for the login edge stay quiet.
    pub fn update_permissions(&self, updates: HashMap<String, bool>) {
        let (prev, next) = {
            let mut state = self.state.lock().unwrap();
            let prev = state.clone();
            state.permissions.extend(updates);
            (prev, state.clone())
        };
        self.persist(&next);
        self.notify(&prev, &next);
    }

    pub fn logout(&self) {
        let (prev, next) = {
            let mut state = self.state.lock().unwrap();
            let prev = state.clone();
            *state = Session::default();
            (prev, state.clone())
        };
        if let Some(path) = &self.storage_path {
            if path.exists() {
                if let Err(err) = fs::remove_file(path) {
                    warn!("failed to clear persisted session: {err:#}");
                }
            }
        }
        self.notify(&prev, &next);
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.lock().unwrap().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.state.lock().unwrap().clone()
    }

    /// Register a change listener invoked with `(prev, next)` snapshots.
    pub fn subscribe(&self, listener: AuthListener) -> AuthSubscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, listener));
        AuthSubscription { id, listeners: Arc::downgrade(&self.listeners) }
    }

    fn notify(&self, prev: &Session, next: &Session) {
        let snapshot: Vec<AuthListener> = {
            let listeners = self.listeners.lock().unwrap();
            listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(prev, next))).is_err() {
                warn!("auth listener panicked; continuing");
            }
        }
    }

    fn persist(&self, session: &Session) {
        let Some(path) = &self.storage_path else { return };
        let result = (|| -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
            }
            let content =
                toml::to_string_pretty(session).context("Failed to serialize session to TOML")?;
            fs::write(path, content)
                .with_context(|| format!("Failed to write session file: {:?}", path))?;
            Ok(())
        })();
        if let Err(err) = result {
            warn!("session not persisted: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id: &str) -> User {
        User { id: id.into(), name: None, role: Role::Driver }
    }

    #[test]
    fn set_user_notifies_with_prev_and_next() {
        let store = AuthStore::in_memory();
        let seen: Arc<Mutex<Vec<(Option<String>, Option<String>)>>> =
            Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = store.subscribe(Arc::new(move |prev, next| {
            sink.lock().unwrap().push((
                prev.user.as_ref().map(|u| u.id.clone()),
                next.user.as_ref().map(|u| u.id.clone()),
            ));
        }));

        store.set_user(driver("u1"), Some("tok".into()));
        store.logout();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (None, Some("u1".to_string())),
                (Some("u1".to_string()), None),
            ]
        );
    }

    #[test]
    fn permission_update_does_not_change_user() {
        let store = AuthStore::in_memory();
        store.set_user(driver("u1"), None);
        store.update_permissions(HashMap::from([("canDecant".to_string(), true)]));

        let session = store.snapshot();
        assert_eq!(session.user.as_ref().unwrap().id, "u1");
        assert_eq!(session.permissions.get("canDecant"), Some(&true));
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let store = AuthStore::in_memory();
        let count = Arc::new(Mutex::new(0u32));
        let sink = count.clone();
        let sub = store.subscribe(Arc::new(move |_, _| {
            *sink.lock().unwrap() += 1;
        }));
        sub.unsubscribe();
        store.set_user(driver("u1"), None);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn session_round_trips_through_storage() {
        let path = std::env::temp_dir()
            .join(format!("fuelnet-session-{}.toml", uuid::Uuid::new_v4()));
        {
            let store = AuthStore::with_storage(path.clone());
            store.set_user(
                User { id: "u7".into(), name: Some("Asha".into()), role: Role::DbsOperator },
                Some("tok-7".into()),
            );
        }

        let restored = AuthStore::with_storage(path.clone());
        assert!(restored.rehydrate().unwrap());
        let session = restored.snapshot();
        assert_eq!(session.user.as_ref().unwrap().role, Role::DbsOperator);
        assert_eq!(session.token.as_deref(), Some("tok-7"));

        restored.logout();
        assert!(!path.exists());
    }

    #[test]
    fn rehydrate_without_file_is_a_no_op() {
        let path = std::env::temp_dir()
            .join(format!("fuelnet-session-{}.toml", uuid::Uuid::new_v4()));
        let store = AuthStore::with_storage(path);
        assert!(!store.rehydrate().unwrap());
        assert_eq!(store.current_user(), None);
    }
}
