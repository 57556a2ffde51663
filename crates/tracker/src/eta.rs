//! Arrival estimates for a vehicle at the stops of its route.

use std::fmt;

use crate::models::entities::{Stop, Vehicle};
use crate::models::types::Eta;
use crate::spatial::queries::haversine_distance;

pub trait EtaEstimator: Send + Sync + fmt::Debug {
    fn estimate(&self, vehicle: &Vehicle, stop: &Stop) -> Eta;
}

/// Straight-line distance to the stop over the vehicle's current speed.
#[derive(Clone, Copy, Debug, Default)]
pub struct StraightLineEstimator;

impl EtaEstimator for StraightLineEstimator {
    fn estimate(&self, vehicle: &Vehicle, stop: &Stop) -> Eta {
        let Some(route) = vehicle.route_id() else {
            return Eta::Unknown;
        };
        if !stop.serves(route) {
            return Eta::Unknown;
        }

        let speed = vehicle.speed();
        if !(speed.is_finite() && speed > 0.0) {
            return Eta::Unknown;
        }

        let distance = haversine_distance(vehicle.location(), stop.location());
        let minutes = (distance / speed * 60.0).floor();
        if !minutes.is_finite() || minutes < 0.0 {
            return Eta::Unknown;
        }

        Eta::Minutes(minutes.min(u32::MAX as f64) as u32)
    }
}
