//! Route assignment from a vehicle's recent positions.
//!
//! [`RouteMatcher`] owns the assignment rule (closest route wins, ties keep
//! the previous route, otherwise the lowest id). How "closest" is measured is
//! a pluggable [`RouteDistance`] metric.

pub mod segment;
pub mod vertex;

use std::fmt;

use tracing::debug;

use crate::config::TrackerConfig;
use crate::identifiers::RouteIdentifier;
use crate::models::entities::{Route, RouteTable, Vehicle};
use crate::models::types::GeoPoint;
use crate::spatial::queries::degrees_to_miles;

pub use segment::SegmentDistance;
pub use vertex::VertexDistance;

/// Distance in miles from a position to a route.
pub trait RouteDistance: Send + Sync + fmt::Debug {
    fn distance(&self, position: GeoPoint, route: &Route) -> f64;
}

#[derive(Debug)]
pub struct RouteMatcher {
    metric: Box<dyn RouteDistance>,
    tie_tolerance_miles: f64,
    max_route_distance_miles: f64,
}

impl RouteMatcher {
    pub fn new(
        metric: Box<dyn RouteDistance>,
        tie_tolerance_miles: f64,
        max_route_distance_miles: f64,
    ) -> Self {
        Self {
            metric,
            tie_tolerance_miles,
            max_route_distance_miles,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(
            config.route_metric.build(),
            degrees_to_miles(config.tie_tolerance_degrees),
            config.max_route_distance_miles,
        )
    }

    pub fn metric(&self) -> &dyn RouteDistance {
        self.metric.as_ref()
    }

    /// Pick the route closest to `position`.
    ///
    /// Routes whose distance lies within the tie tolerance of the best one
    /// are all candidates. Among several candidates `previous` wins if it is
    /// one of them, otherwise the lowest route id does.
    pub fn best_route<'a>(
        &self,
        position: GeoPoint,
        previous: Option<RouteIdentifier>,
        routes: impl IntoIterator<Item = &'a Route>,
    ) -> Option<RouteIdentifier> {
        let distances: Vec<(RouteIdentifier, f64)> = routes
            .into_iter()
            .map(|route| (route.id(), self.metric.distance(position, route)))
            .filter(|(_, distance)| distance.is_finite())
            .collect();

        let best = distances
            .iter()
            .map(|(_, distance)| *distance)
            .min_by(f64::total_cmp)?;

        let mut tied: Vec<RouteIdentifier> = distances
            .iter()
            .filter(|(_, distance)| distance - best <= self.tie_tolerance_miles)
            .map(|(id, _)| *id)
            .collect();
        tied.sort_unstable();

        match (tied.as_slice(), previous) {
            ([only], _) => Some(*only),
            (_, Some(previous)) if tied.contains(&previous) => Some(previous),
            _ => tied.first().copied(),
        }
    }

    /// Route the vehicle is following, judged from its latest position.
    ///
    /// `None` until the vehicle has recorded a position or while no route is
    /// known.
    pub fn assign(&self, vehicle: &Vehicle, routes: &RouteTable) -> Option<RouteIdentifier> {
        let position = vehicle.history().latest()?;
        self.best_route(
            position,
            vehicle.route_id(),
            routes.values().map(|route| route.as_ref()),
        )
    }

    pub(crate) fn update_assignment(&self, vehicle: &mut Vehicle, routes: &RouteTable) {
        let assigned = self.assign(vehicle, routes);
        if assigned != vehicle.route_id() {
            debug!(
                vehicle = %vehicle.id(),
                from = ?vehicle.route_id(),
                to = ?assigned,
                "route reassigned"
            );
        }
        vehicle.set_route(assigned);
    }

    /// True when the vehicle is farther than the configured maximum from its
    /// assigned route, or has no (known) assigned route at all.
    pub fn is_too_far_from_route(&self, vehicle: &Vehicle, routes: &RouteTable) -> bool {
        let Some(route) = vehicle.route_id().and_then(|id| routes.get(&id)) else {
            return true;
        };
        let distance = self.metric.distance(vehicle.location(), route);
        distance.is_nan() || distance > self.max_route_distance_miles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entities::tests::{route, vehicle_record};
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn table(routes: Vec<Route>) -> RouteTable {
        routes.into_iter().map(|r| (r.id(), Arc::new(r))).collect::<HashMap<_, _>>()
    }

    fn matcher() -> RouteMatcher {
        RouteMatcher::new(Box::new(VertexDistance), degrees_to_miles(5e-4), 10.0)
    }

    fn vehicle_at(points: &[(f64, f64)]) -> Vehicle {
        let t0 = Utc::now();
        let mut iter = points.iter().enumerate();
        let (_, &(lat, lon)) = iter.next().unwrap();
        let record = vehicle_record(1, GeoPoint::new(lat, lon), 10.0, t0);
        let mut vehicle = Vehicle::from_record(record, 10);
        for (i, &(lat, lon)) in iter {
            let t = t0 + Duration::seconds(i as i64);
            vehicle.merge(vehicle_record(1, GeoPoint::new(lat, lon), 10.0, t));
        }
        vehicle
    }

    fn symmetric_routes() -> RouteTable {
        // Mirror images around the equator, equally far from (0, 0)
        table(vec![
            route(1, &[(1.0, 0.0), (2.0, 0.0)]),
            route(2, &[(-1.0, 0.0), (-2.0, 0.0)]),
        ])
    }

    #[test]
    fn test_history_on_route_vertices_assigns_that_route() {
        let routes = table(vec![
            route(1, &[(0.0, 0.0), (0.0, 1.0), (0.0, 2.0)]),
            route(2, &[(1.0, 0.0), (1.0, 1.0), (1.0, 2.0)]),
        ]);
        let vehicle = vehicle_at(&[(1.0, 0.0), (1.0, 1.0), (1.0, 2.0)]);

        assert_eq!(matcher().assign(&vehicle, &routes), Some(RouteIdentifier::new(2)));
    }

    #[test]
    fn test_only_latest_position_counts() {
        let routes = table(vec![
            route(1, &[(0.0, 0.0), (0.0, 1.0)]),
            route(2, &[(1.0, 0.0), (1.0, 1.0)]),
        ]);
        let vehicle = vehicle_at(&[(1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);

        assert_eq!(matcher().assign(&vehicle, &routes), Some(RouteIdentifier::new(1)));
    }

    #[test]
    fn test_tie_without_previous_picks_lowest_id() {
        let vehicle = vehicle_at(&[(0.0, 0.0)]);
        assert_eq!(matcher().assign(&vehicle, &symmetric_routes()), Some(RouteIdentifier::new(1)));
    }

    #[test]
    fn test_tie_keeps_previous_route() {
        let routes = symmetric_routes();
        let mut vehicle = vehicle_at(&[(0.0, 0.0)]);
        vehicle.set_route(Some(RouteIdentifier::new(2)));

        let matcher = matcher();
        for _ in 0..3 {
            matcher.update_assignment(&mut vehicle, &routes);
            assert_eq!(vehicle.route_id(), Some(RouteIdentifier::new(2)));
        }
    }

    #[test]
    fn test_near_tie_within_tolerance_counts_as_tie() {
        let routes = table(vec![
            route(1, &[(1.0, 0.0), (2.0, 0.0)]),
            route(2, &[(-1.0002, 0.0), (-2.0, 0.0)]),
        ]);
        let mut vehicle = vehicle_at(&[(0.0, 0.0)]);
        vehicle.set_route(Some(RouteIdentifier::new(2)));

        assert_eq!(matcher().assign(&vehicle, &routes), Some(RouteIdentifier::new(2)));
    }

    #[test]
    fn test_clear_winner_overrides_previous_route() {
        let routes = table(vec![
            route(1, &[(0.1, 0.0), (2.0, 0.0)]),
            route(2, &[(-1.0, 0.0), (-2.0, 0.0)]),
        ]);
        let mut vehicle = vehicle_at(&[(0.0, 0.0)]);
        vehicle.set_route(Some(RouteIdentifier::new(2)));

        assert_eq!(matcher().assign(&vehicle, &routes), Some(RouteIdentifier::new(1)));
    }

    #[test]
    fn test_no_routes_leaves_assignment_unset() {
        let vehicle = vehicle_at(&[(0.0, 0.0)]);
        assert_eq!(matcher().assign(&vehicle, &RouteTable::new()), None);
    }

    #[test]
    fn test_too_far_from_route() {
        let routes = table(vec![route(1, &[(0.0, 0.0), (0.0, 0.01)])]);
        let matcher = matcher();

        let mut near = vehicle_at(&[(0.0, 0.005)]);
        matcher.update_assignment(&mut near, &routes);
        assert!(!matcher.is_too_far_from_route(&near, &routes));

        let mut far = vehicle_at(&[(1.0, 0.0)]);
        matcher.update_assignment(&mut far, &routes);
        assert_eq!(far.route_id(), Some(RouteIdentifier::new(1)));
        assert!(matcher.is_too_far_from_route(&far, &routes));
    }

    #[test]
    fn test_unassigned_vehicle_is_too_far() {
        let routes = table(vec![route(1, &[(0.0, 0.0), (0.0, 0.01)])]);
        let vehicle = vehicle_at(&[(0.0, 0.0)]);

        assert!(matcher().is_too_far_from_route(&vehicle, &routes));
    }
}
