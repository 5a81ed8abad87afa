//! Notification routing and pending-intent reconciliation.
//!
//! Push and WebSocket payloads arrive whenever the transport feels like it;
//! the navigation surface mounts late and the user may still be logging in
//! or rehydrating. The router reconciles the three: it always emits the
//! normalized event to subscribers, navigates immediately when the surface
//! and a matching-role user are both present, and otherwise defers a single
//! navigation intent that is replayed once the missing piece shows up.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

use log::{debug, info, warn};
use serde_json::Value;

use crate::auth::{AuthStore, AuthSubscription, Session};

use super::event::{EventKind, NotificationEvent};
use super::intent::{IntentSlot, PendingIntent};
use super::navigation::NavigationSurface;
use super::registry::{ListenerFn, ListenerRegistry, Subscription};
use super::rules::rule_for;

pub struct NotificationRouter {
    auth: Arc<AuthStore>,
    registry: ListenerRegistry,
    intent: IntentSlot,
    navigation: Mutex<Option<Arc<dyn NavigationSurface>>>,
    auth_sub: Mutex<Option<AuthSubscription>>,
}

impl NotificationRouter {
    /// Build a router bound to an auth store. The router subscribes to auth
    /// changes itself so a login or session rehydration flushes any deferred
    /// intent without the host having to remember to.
    pub fn new(auth: Arc<AuthStore>) -> Arc<Self> {
        let router = Arc::new(Self {
            auth: Arc::clone(&auth),
            registry: ListenerRegistry::new(),
            intent: IntentSlot::new(),
            navigation: Mutex::new(None),
            auth_sub: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&router);
        let sub = auth.subscribe(Arc::new(move |prev, next| {
            if let Some(router) = weak.upgrade() {
                router.on_auth_transition(prev, next);
            }
        }));
        *router.auth_sub.lock().unwrap() = Some(sub);

        router
    }

    /// Entry point for the transport. Never panics past this boundary and
    /// never returns an error: a malformed payload must not take the host
    /// down or block delivery of the next, unrelated event.
    pub fn handle_inbound_payload(&self, raw: &Value) {
        let Some(event) = NotificationEvent::from_raw(raw) else {
            debug!("dropping payload without a usable type discriminator");
            return;
        };

        let Some(rule) = rule_for(&event.kind) else {
            // No navigation behavior for this kind; deliver to exact-kind
            // listeners and move on.
            self.registry.emit(&event.kind, event.payload);
            return;
        };

        let params = event.navigation_params();
        let user = self.auth.current_user();
        let navigation = self.navigation.lock().unwrap().clone();

        let role_matches = user.as_ref().map(|u| u.role == rule.required_role).unwrap_or(false);
        match (&navigation, role_matches) {
            (Some(nav), true) => {
                info!("routing {} -> {}", event.kind, rule.destination.route_name());
                invoke_navigation(nav.as_ref(), rule.destination, &params);
                self.registry.emit(&event.kind, event.payload);
            }
            _ => {
                // Emit anyway: an already-mounted, role-correct screen must
                // still react even though imperative navigation cannot run.
                debug!(
                    "deferring {} (surface={}, role_match={})",
                    event.kind,
                    navigation.is_some(),
                    role_matches
                );
                self.registry.emit(&event.kind, event.payload.clone());
                self.intent.store(PendingIntent {
                    destination: rule.destination,
                    params,
                    kind: event.kind,
                    payload: event.payload,
                });
            }
        }
    }

    /// Record the navigation capability once the host's navigation tree has
    /// mounted, then replay any deferred intent against it.
    pub fn attach_navigation_surface(&self, surface: Arc<dyn NavigationSurface>) {
        *self.navigation.lock().unwrap() = Some(surface);
        self.flush_pending_intent();
    }

    /// Replay the stored intent if navigation and an authenticated user are
    /// both available. Safe to call at any time; a call with nothing pending
    /// or with prerequisites unmet does nothing.
    pub fn flush_pending_intent(&self) {
        let Some(navigation) = self.navigation.lock().unwrap().clone() else { return };
        if self.auth.current_user().is_none() {
            return;
        }
        let Some(intent) = self.intent.take() else { return };

        info!("flushing deferred {} -> {}", intent.kind, intent.destination.route_name());
        invoke_navigation(navigation.as_ref(), intent.destination, &intent.params);
        self.registry.emit(&intent.kind, intent.payload);
    }

    /// Auth change hook. Only the `no user -> user` edge (login or cold-start
    /// rehydration) triggers a flush; permission churn with a user already
    /// present does not.
    pub fn on_auth_transition(&self, prev: &Session, next: &Session) {
        if prev.user.is_none() && next.user.is_some() {
            self.flush_pending_intent();
        }
    }

    /// Subscribe to normalized events of one kind.
    pub fn subscribe(&self, kind: EventKind, listener: ListenerFn) -> Subscription {
        self.registry.subscribe(kind, listener)
    }

    /// Most recent payload emitted for `kind`, for subscribers that mounted
    /// after the event fired.
    pub fn last_event(&self, kind: &EventKind) -> Option<Value> {
        self.registry.last_event(kind)
    }

    /// Consume the cached payload for `kind`.
    pub fn clear_last_event(&self, kind: &EventKind) {
        self.registry.clear_last_event(kind)
    }

    /// Diagnostic view of the deferred intent, if any.
    pub fn pending_intent(&self) -> Option<PendingIntent> {
        self.intent.peek()
    }
}

fn invoke_navigation(surface: &dyn NavigationSurface, destination: super::rules::Destination, params: &Value) {
    if catch_unwind(AssertUnwindSafe(|| surface.navigate_to(destination, params))).is_err() {
        warn!("navigation surface panicked for {}", destination.route_name());
    }
}
