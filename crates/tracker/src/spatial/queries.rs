//! Spatial query utilities for distance calculations.
//!
//! Distances are great-circle distances in miles on a sphere of radius
//! [`EARTH_RADIUS_MILES`], computed with the haversine formula.

use geo::{ClosestPoint, Line, LineString};

use crate::models::types::GeoPoint;

pub const EARTH_RADIUS_MILES: f64 = 3961.3;

/// Great-circle distance between two points in miles.
///
/// The haversine term is clamped to `[0, 1]` so rounding overshoot near
/// identical or antipodal points cannot push `sqrt` out of its domain.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Initial great-circle bearing from `a` towards `b`, in degrees `[0, 360)`.
pub fn initial_bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let y = d_lon.sin() * lat_b.cos();
    let x = lat_a.cos() * lat_b.sin() - lat_a.sin() * lat_b.cos() * d_lon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Closest point on a segment, projected in latitude/longitude space.
pub fn closest_point_on_line(point: GeoPoint, line: Line) -> Option<GeoPoint> {
    let line_string = LineString::from(vec![line.start, line.end]);

    match line_string.closest_point(&geo::Point::from(point)) {
        geo::Closest::Intersection(p) | geo::Closest::SinglePoint(p) => Some(p.into()),
        geo::Closest::Indeterminate => None,
    }
}

/// Calculate distance from point to line segment in miles
pub fn haversine_distance_to_line(point: GeoPoint, line: Line) -> f64 {
    match closest_point_on_line(point, line) {
        Some(p) => haversine_distance(point, p),
        None => f64::INFINITY,
    }
}

/// Arc length in miles subtended by an angle in degrees
pub fn degrees_to_miles(degrees: f64) -> f64 {
    degrees.to_radians() * EARTH_RADIUS_MILES
}

pub fn miles_to_degrees(miles: f64) -> f64 {
    (miles / EARTH_RADIUS_MILES).to_degrees()
}
