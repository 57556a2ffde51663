//! Already-decoded feed records consumed by the world.
//!
//! Fetching and parsing the wire format is the feed collaborator's job; these
//! are what it hands over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::GeoPoint;

/// One route from the static feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: RouteIdentifier,
    pub name: String,
    pub polyline: Vec<GeoPoint>,
}

/// One stop from the static feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StopRecord {
    pub short_name: StopIdentifier,
    pub name: String,
    pub location: GeoPoint,
    pub route_ids: Vec<RouteIdentifier>,
}

/// One position report from the vehicle feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: VehicleIdentifier,
    #[serde(default)]
    pub name: Option<String>,
    pub location: GeoPoint,
    /// Miles per hour
    pub speed: f64,
    /// Degrees clockwise from north, when the feed reports one
    #[serde(default)]
    pub heading: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Everything the static feed yields in one fetch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticFeed {
    pub routes: Vec<RouteRecord>,
    pub stops: Vec<StopRecord>,
}

/// Why a record was dropped during ingestion.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("route {0} has fewer than two polyline points")]
    PolylineTooShort(RouteIdentifier),

    #[error("route {route} has invalid coordinate {point}")]
    InvalidRoutePoint { route: RouteIdentifier, point: GeoPoint },

    #[error("stop {stop} has invalid location {point}")]
    InvalidStopLocation { stop: StopIdentifier, point: GeoPoint },

    #[error("stop {0} serves no routes")]
    StopWithoutRoutes(StopIdentifier),

    #[error("stop {stop} references unknown route {route}")]
    UnknownRoute { stop: StopIdentifier, route: RouteIdentifier },

    #[error("vehicle {vehicle} reported invalid location {point}")]
    InvalidVehicleLocation { vehicle: VehicleIdentifier, point: GeoPoint },

    #[error("vehicle {vehicle} reported non-finite speed {speed}")]
    InvalidSpeed { vehicle: VehicleIdentifier, speed: f64 },
}

impl VehicleRecord {
    pub fn validate(&self) -> Result<(), RecordError> {
        if !self.location.is_valid() {
            return Err(RecordError::InvalidVehicleLocation {
                vehicle: self.id,
                point: self.location,
            });
        }
        if !self.speed.is_finite() {
            return Err(RecordError::InvalidSpeed {
                vehicle: self.id,
                speed: self.speed,
            });
        }
        Ok(())
    }
}
