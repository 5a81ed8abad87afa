use log::info;
use serde_json::Value;

use super::rules::Destination;

/// Imperative navigation capability supplied by the host once its navigation
/// tree has mounted. Implementations must tolerate being asked to navigate
/// to the destination that is already active.
pub trait NavigationSurface: Send + Sync {
    fn navigate_to(&self, destination: Destination, params: &Value);
}

/// Navigation surface for headless runs: logs where a UI would have gone.
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl NavigationSurface for LoggingNavigator {
    fn navigate_to(&self, destination: Destination, params: &Value) {
        info!("navigate -> {} params={}", destination.route_name(), params);
    }
}
