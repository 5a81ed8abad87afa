//! Inbound payload normalization.
//!
//! The backend (and its older push templates) is inconsistent about key
//! spelling: the same trip id arrives as `tripId`, `trip_id` or
//! `stock_request_id` depending on which service produced the message. This
//! module folds every known spelling into one canonical camelCase payload so
//! subscribers and navigation params only ever deal with one shape.

use serde_json::{Map, Value, json};

/// Discriminator for inbound notification payloads.
///
/// `Other` carries kinds with no routing behavior (e.g. `connection_status`)
/// so listeners registered for that exact string still receive them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    TripAssignment,
    DbsArrival,
    MsArrival,
    DriverResponse,
    RouteDeviation,
    GasVariance,
    StockRequest,
    Other(String),
}

impl EventKind {
    /// Parse a wire `type` string, folding legacy aliases into their
    /// canonical kind.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "trip_assignment" | "TRIP_OFFER" => EventKind::TripAssignment,
            "dbs_arrival" => EventKind::DbsArrival,
            "ms_arrival" => EventKind::MsArrival,
            "driver_response" | "DRIVER_ACCEPTED" | "DRIVER_REJECTED" | "ASSIGNMENT_EXPIRED" => {
                EventKind::DriverResponse
            }
            "route_deviation" => EventKind::RouteDeviation,
            "gas_variance" => EventKind::GasVariance,
            "stock_request" | "STOCK_REQUEST" => EventKind::StockRequest,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TripAssignment => "trip_assignment",
            EventKind::DbsArrival => "dbs_arrival",
            EventKind::MsArrival => "ms_arrival",
            EventKind::DriverResponse => "driver_response",
            EventKind::RouteDeviation => "route_deviation",
            EventKind::GasVariance => "gas_variance",
            EventKind::StockRequest => "stock_request",
            EventKind::Other(s) => s,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized inbound notification. Immutable once constructed; the payload
/// keeps the raw fields alongside the canonical ones.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl NotificationEvent {
    /// Normalize a raw transport payload. Returns `None` when the payload has
    /// no usable discriminator; malformed input is the transport's problem,
    /// never this client's crash.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;

        let type_str = match obj.get("type").and_then(Value::as_str) {
            Some(t) if !t.is_empty() => t.to_string(),
            // Some stock request pushes only carry `notification_type`.
            _ if obj.get("notification_type").and_then(Value::as_str) == Some("stock_request") => {
                "stock_request".to_string()
            }
            _ => return None,
        };

        let kind = EventKind::parse(&type_str);
        let payload = normalize_payload(&kind, obj, &type_str);
        Some(NotificationEvent { kind, payload })
    }

    /// Navigation params for this event: the payload plus the marker the
    /// target screens check to distinguish a notification deep-link from
    /// ordinary navigation.
    pub fn navigation_params(&self) -> Value {
        let mut params = self.payload.clone();
        if let Some(map) = params.as_object_mut() {
            map.insert("fromNotification".into(), json!(true));
        }
        params
    }
}

/// First present value among alternative spellings of the same field.
fn first(obj: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null()).cloned())
}

fn set(out: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value);
    }
}

fn normalize_payload(kind: &EventKind, raw: &Map<String, Value>, type_str: &str) -> Value {
    let mut out = raw.clone();
    out.insert("type".into(), json!(kind.as_str()));

    match kind {
        EventKind::TripAssignment => {
            set(&mut out, "tripId", first(raw, &["stock_request_id", "tripId", "trip_id"]));
            set(&mut out, "dbsId", first(raw, &["to_dbs", "dbs_name", "dbsId"]));
            // Raw numeric id kept separately; screens need it for API calls.
            set(&mut out, "dbsIdRaw", first(raw, &["dbs_id"]));
            set(&mut out, "quantity", first(raw, &["quantity_kg", "quantity"]));
            set(&mut out, "msId", first(raw, &["from_ms", "msId"]).or(Some(json!("MS-001"))));
        }
        EventKind::DbsArrival => {
            set(&mut out, "tripId", first(raw, &["tripId", "trip_id"]));
            set(&mut out, "dbsId", first(raw, &["dbsId", "dbs_id"]));
            set(&mut out, "driverId", first(raw, &["driverId", "driver_id"]));
            set(&mut out, "token", first(raw, &["tripToken", "token", "trip_token"]));
            set(&mut out, "vehicleNo", first(raw, &["truckNumber", "vehicleNo", "truck_number"]));
        }
        EventKind::MsArrival => {
            set(&mut out, "tripId", first(raw, &["tripId", "trip_id"]));
            set(&mut out, "driverId", first(raw, &["driverId", "driver_id"]));
            set(&mut out, "stationId", first(raw, &["stationId", "station_id"]));
            set(&mut out, "token", first(raw, &["tripToken", "token", "trip_token"]));
            set(&mut out, "vehicleNo", first(raw, &["truckNumber", "vehicleNo", "truck_number"]));
        }
        EventKind::DriverResponse => {
            set(&mut out, "requestId", first(raw, &["requestId", "stock_request_id"]));
            set(&mut out, "driverId", first(raw, &["driverId", "driver_id"]));
            set(&mut out, "driverName", first(raw, &["driverName", "driver_name"]));
            set(&mut out, "dbsName", first(raw, &["dbsName", "dbs_name"]));
            set(&mut out, "action", derive_driver_action(raw, type_str));
        }
        EventKind::RouteDeviation => {
            set(&mut out, "tripId", first(raw, &["tripId", "trip_id"]));
            set(&mut out, "driverId", first(raw, &["driverId", "driver_id"]));
            set(&mut out, "currentLocation", first(raw, &["currentLocation", "current_location"]));
            set(&mut out, "deviationDistance", first(raw, &["deviationDistance", "deviation_distance"]));
        }
        EventKind::GasVariance => {
            set(&mut out, "tripId", first(raw, &["tripId", "trip_id"]));
            set(&mut out, "msDispatchAmount", first(raw, &["msDispatchAmount", "ms_dispatch_amount"]));
            set(&mut out, "dbsReceivedAmount", first(raw, &["dbsReceivedAmount", "dbs_received_amount"]));
            set(&mut out, "variancePercentage", first(raw, &["variancePercentage", "variance_percentage"]));
        }
        EventKind::StockRequest => {
            set(&mut out, "requestId", first(raw, &["stockRequestId", "stock_request_id", "requestId"]));
            set(&mut out, "dbsId", first(raw, &["dbsId", "dbs_id"]));
            set(&mut out, "dbsName", first(raw, &["dbsName", "dbs_name"]));
            set(&mut out, "msId", first(raw, &["msId", "ms_id"]));
            set(&mut out, "msName", first(raw, &["msName", "ms_name"]));
        }
        EventKind::Other(_) => {}
    }

    Value::Object(out)
}

/// The response action is spelled three different ways across backend
/// versions: an explicit `action`, a `status`, or only the legacy type.
fn derive_driver_action(raw: &Map<String, Value>, type_str: &str) -> Option<Value> {
    if let Some(action) = first(raw, &["action", "status"]) {
        return Some(action);
    }
    match type_str {
        "DRIVER_ACCEPTED" => Some(json!("ACCEPTED")),
        "DRIVER_REJECTED" => Some(json!("REJECTED")),
        "ASSIGNMENT_EXPIRED" => Some(json!("REASSIGN_REQUIRED")),
        _ => None,
    }
}
