use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::event::EventKind;

/// Operator roles as the backend spells them in JWT claims and user records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Driver,
    SglDriver,
    DbsOperator,
    MsOperator,
    Eic,
}

impl Role {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Role::Driver => "DRIVER",
            Role::SglDriver => "SGL_DRIVER",
            Role::DbsOperator => "DBS_OPERATOR",
            Role::MsOperator => "MS_OPERATOR",
            Role::Eic => "EIC",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "DRIVER" => Some(Role::Driver),
            "SGL_DRIVER" => Some(Role::SglDriver),
            "DBS_OPERATOR" => Some(Role::DbsOperator),
            "MS_OPERATOR" => Some(Role::MsOperator),
            "EIC" => Some(Role::Eic),
            _ => None,
        }
    }
}

/// Navigation destinations the router can target. These are the route names
/// registered by the host navigation surface, so the enum is closed on purpose:
/// a notification can only ever deep-link into one of these screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    DriverDashboard,
    Decanting,
    Operations,
    StockRequests,
}

impl Destination {
    /// Route name as the navigation surface knows it.
    pub fn route_name(&self) -> &'static str {
        match self {
            Destination::DriverDashboard => "DriverDashboard",
            Destination::Decanting => "Decanting",
            Destination::Operations => "Operations",
            Destination::StockRequests => "StockRequests",
        }
    }
}

/// A single routing rule: which role a notification kind is meant for, and
/// where it deep-links. The table is fixed at compile time; the backend owns
/// the set of notification kinds and this client merely mirrors it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingRule {
    pub required_role: Role,
    pub destination: Destination,
}

static ROUTING_RULES: Lazy<HashMap<EventKind, RoutingRule>> = Lazy::new(|| {
    let mut rules = HashMap::new();
    rules.insert(
        EventKind::TripAssignment,
        RoutingRule { required_role: Role::Driver, destination: Destination::DriverDashboard },
    );
    rules.insert(
        EventKind::DbsArrival,
        RoutingRule { required_role: Role::DbsOperator, destination: Destination::Decanting },
    );
    rules.insert(
        EventKind::MsArrival,
        RoutingRule { required_role: Role::MsOperator, destination: Destination::Operations },
    );
    rules.insert(
        EventKind::DriverResponse,
        RoutingRule { required_role: Role::Eic, destination: Destination::StockRequests },
    );
    rules.insert(
        EventKind::RouteDeviation,
        RoutingRule { required_role: Role::Eic, destination: Destination::StockRequests },
    );
    rules.insert(
        EventKind::GasVariance,
        RoutingRule { required_role: Role::Eic, destination: Destination::StockRequests },
    );
    rules.insert(
        EventKind::StockRequest,
        RoutingRule { required_role: Role::Eic, destination: Destination::StockRequests },
    );
    rules
});

/// Look up the routing rule for a notification kind. Kinds without a rule
/// (connection status, future backend additions) are emit-only.
pub fn rule_for(kind: &EventKind) -> Option<RoutingRule> {
    ROUTING_RULES.get(kind).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_strings_round_trip() {
        for role in [Role::Driver, Role::SglDriver, Role::DbsOperator, Role::MsOperator, Role::Eic] {
            assert_eq!(Role::from_wire(role.as_wire()), Some(role));
        }
        assert_eq!(Role::from_wire("DISPATCHER"), None);
    }

    #[test]
    fn every_routed_kind_has_a_rule() {
        assert_eq!(
            rule_for(&EventKind::DbsArrival),
            Some(RoutingRule { required_role: Role::DbsOperator, destination: Destination::Decanting })
        );
        assert_eq!(
            rule_for(&EventKind::MsArrival),
            Some(RoutingRule { required_role: Role::MsOperator, destination: Destination::Operations })
        );
        assert_eq!(
            rule_for(&EventKind::TripAssignment).map(|r| r.destination),
            Some(Destination::DriverDashboard)
        );
        for kind in [EventKind::DriverResponse, EventKind::RouteDeviation, EventKind::GasVariance, EventKind::StockRequest] {
            let rule = rule_for(&kind).unwrap();
            assert_eq!(rule.required_role, Role::Eic);
            assert_eq!(rule.destination, Destination::StockRequests);
        }
    }

    #[test]
    fn unrouted_kinds_have_no_rule() {
        assert_eq!(rule_for(&EventKind::Other("connection_status".into())), None);
    }
}
