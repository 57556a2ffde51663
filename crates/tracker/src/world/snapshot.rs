//! Read-only views handed to consumers of the world.
//!
//! Routes and stops are immutable and shared as `Arc`s; vehicles are copied
//! into [`VehicleSnapshot`]s.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::identifiers::*;
use crate::models::entities::{Route, Stop, Vehicle};
use crate::models::types::{CardinalDirection, Eta, GeoPoint};

#[derive(Clone, Debug, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleIdentifier,
    pub name: Option<String>,
    pub location: GeoPoint,
    /// Miles per hour
    pub speed: f64,
    pub heading: Option<CardinalDirection>,
    pub route_id: Option<RouteIdentifier>,
    pub etas: BTreeMap<StopIdentifier, Eta>,
    pub last_update: DateTime<Utc>,
    /// Seconds since `last_update` when the snapshot was taken
    pub age_secs: i64,
    pub history_len: usize,
}

impl VehicleSnapshot {
    pub fn capture(vehicle: &Vehicle, now: DateTime<Utc>) -> Self {
        Self {
            id: vehicle.id(),
            name: vehicle.name().map(str::to_owned),
            location: vehicle.location(),
            speed: vehicle.speed(),
            heading: vehicle.heading_label(),
            route_id: vehicle.route_id(),
            etas: vehicle
                .etas()
                .iter()
                .map(|(stop, eta)| (stop.clone(), *eta))
                .collect(),
            last_update: vehicle.last_update(),
            age_secs: now.signed_duration_since(vehicle.last_update()).num_seconds(),
            history_len: vehicle.history().len(),
        }
    }

    pub fn eta(&self, stop: &str) -> Option<Eta> {
        self.etas.get(stop).copied()
    }
}

impl PartialEq for VehicleSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VehicleSnapshot {}

impl Hash for VehicleSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Serialize for Route {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Route", 3)?;
        state.serialize_field("id", &self.id())?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("polyline", self.polyline())?;
        state.end()
    }
}

impl Serialize for Stop {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let routes: Vec<RouteIdentifier> = self.route_ids().collect();
        let snapped: BTreeMap<RouteIdentifier, GeoPoint> = routes
            .iter()
            .filter_map(|route| self.snapped_location(*route).map(|p| (*route, p)))
            .collect();

        let mut state = serializer.serialize_struct("Stop", 5)?;
        state.serialize_field("short_name", self.short_name())?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("location", &self.location())?;
        state.serialize_field("route_ids", &routes)?;
        state.serialize_field("snapped", &snapped)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entities::tests::{route, vehicle_record};
    use chrono::Duration;

    #[test]
    fn test_snapshot_age_and_identity() {
        let t0 = Utc::now();
        let record = vehicle_record(8, GeoPoint::new(0.0, 0.0), 10.0, t0);
        let vehicle = Vehicle::from_record(record, 10);

        let early = VehicleSnapshot::capture(&vehicle, t0 + Duration::seconds(5));
        let late = VehicleSnapshot::capture(&vehicle, t0 + Duration::seconds(30));

        assert_eq!(early.age_secs, 5);
        assert_eq!(late.age_secs, 30);
        assert_eq!(early, late);
        assert_eq!(early.history_len, 1);
    }

    #[test]
    fn test_route_serializes_without_index() {
        let r = route(3, &[(0.0, 0.0), (0.0, 1.0)]);
        let json = serde_json::to_value(&r).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["name"], "Route 3");
        assert_eq!(json["polyline"].as_array().unwrap().len(), 2);
        assert!(json.get("segments").is_none());
    }
}
