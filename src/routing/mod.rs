//! Notification event routing: payload normalization, the static routing
//! table, the listener registry, and the pending-intent reconciliation that
//! ties them to auth state and the navigation surface.

pub mod event;
pub mod intent;
pub mod navigation;
pub mod registry;
pub mod router;
pub mod rules;

pub use event::{EventKind, NotificationEvent};
pub use intent::PendingIntent;
pub use navigation::{LoggingNavigator, NavigationSurface};
pub use registry::{ListenerFn, ListenerRegistry, Subscription};
pub use router::NotificationRouter;
pub use rules::{Destination, Role, RoutingRule, rule_for};
