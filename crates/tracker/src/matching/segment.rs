//! Distance to the closest point on the polyline segments.

use crate::models::entities::Route;
use crate::models::types::GeoPoint;

use super::RouteDistance;

#[derive(Clone, Copy, Debug, Default)]
pub struct SegmentDistance;

impl RouteDistance for SegmentDistance {
    fn distance(&self, position: GeoPoint, route: &Route) -> f64 {
        route.distance_to_polyline(position)
    }
}
