//! Distance to the nearest polyline vertex.
//!
//! Positions between widely spaced vertices read as farther from the route
//! than they are; [`super::SegmentDistance`] measures to the segments instead.

use crate::models::entities::Route;
use crate::models::types::GeoPoint;
use crate::spatial::queries::haversine_distance;

use super::RouteDistance;

#[derive(Clone, Copy, Debug, Default)]
pub struct VertexDistance;

impl RouteDistance for VertexDistance {
    fn distance(&self, position: GeoPoint, route: &Route) -> f64 {
        route
            .polyline()
            .iter()
            .map(|vertex| haversine_distance(position, *vertex))
            .fold(f64::INFINITY, f64::min)
    }
}
