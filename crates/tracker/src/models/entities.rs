//! Routes, stops and tracked vehicles.
//!
//! Routes and stops are immutable once built and are replaced wholesale on
//! every static refresh. Vehicles are mutated in place, but only by the
//! world: every mutator here is crate-private.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::identifiers::*;
use crate::models::records::{RecordError, RouteRecord, StopRecord, VehicleRecord};
use crate::models::types::{CardinalDirection, Eta, GeoPoint};
use crate::spatial::index::SegmentIndex;
use crate::spatial::queries::initial_bearing;

/// Upper bound on the number of positions a vehicle remembers.
pub const MAX_HISTORY_LEN: usize = 10;

/// Routes keyed by id, as held by the world.
pub type RouteTable = HashMap<RouteIdentifier, Arc<Route>>;

// ============================================================================
// Route
// ============================================================================

#[derive(Clone, Debug)]
pub struct Route {
    id: RouteIdentifier,
    name: Arc<str>,
    polyline: Vec<GeoPoint>,
    segments: SegmentIndex,
}

impl Route {
    pub fn new(
        id: RouteIdentifier,
        name: impl Into<Arc<str>>,
        polyline: Vec<GeoPoint>,
    ) -> Result<Self, RecordError> {
        if polyline.len() < 2 {
            return Err(RecordError::PolylineTooShort(id));
        }
        if let Some(point) = polyline.iter().find(|p| !p.is_valid()) {
            return Err(RecordError::InvalidRoutePoint { route: id, point: *point });
        }

        let segments = SegmentIndex::from_polyline(&polyline);
        Ok(Self {
            id,
            name: name.into(),
            polyline,
            segments,
        })
    }

    pub fn from_record(record: RouteRecord) -> Result<Self, RecordError> {
        Self::new(record.id, record.name, record.polyline)
    }

    pub fn id(&self) -> RouteIdentifier {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertices in path order
    pub fn polyline(&self) -> &[GeoPoint] {
        &self.polyline
    }

    pub fn segments(&self) -> &SegmentIndex {
        &self.segments
    }

    /// Closest point on the polyline, projected onto the nearest segment.
    pub fn closest_point(&self, point: GeoPoint) -> Option<GeoPoint> {
        self.segments.closest_point(point)
    }

    /// Miles from `point` to the closest point on the polyline.
    pub fn distance_to_polyline(&self, point: GeoPoint) -> f64 {
        self.segments.distance(point)
    }
}

// ============================================================================
// Stop
// ============================================================================

#[derive(Clone, Debug)]
pub struct Stop {
    short_name: StopIdentifier,
    name: Arc<str>,
    location: GeoPoint,
    routes: BTreeSet<RouteIdentifier>,
    snapped: BTreeMap<RouteIdentifier, GeoPoint>,
}

impl Stop {
    /// Build a stop against the current route table.
    ///
    /// Fails if any route the stop names is missing from `routes`; the stop
    /// is snapped onto every route it serves.
    pub fn resolve(record: StopRecord, routes: &RouteTable) -> Result<Self, RecordError> {
        if !record.location.is_valid() {
            return Err(RecordError::InvalidStopLocation {
                stop: record.short_name,
                point: record.location,
            });
        }
        if record.route_ids.is_empty() {
            return Err(RecordError::StopWithoutRoutes(record.short_name));
        }

        let mut snapped = BTreeMap::new();
        for route_id in &record.route_ids {
            let Some(route) = routes.get(route_id) else {
                return Err(RecordError::UnknownRoute {
                    stop: record.short_name,
                    route: *route_id,
                });
            };
            if let Some(point) = route.closest_point(record.location) {
                snapped.insert(*route_id, point);
            }
        }

        Ok(Self {
            short_name: record.short_name,
            name: record.name.into(),
            location: record.location,
            routes: record.route_ids.into_iter().collect(),
            snapped,
        })
    }

    pub fn short_name(&self) -> &StopIdentifier {
        &self.short_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    pub fn route_ids(&self) -> impl Iterator<Item = RouteIdentifier> + '_ {
        self.routes.iter().copied()
    }

    pub fn serves(&self, route: RouteIdentifier) -> bool {
        self.routes.contains(&route)
    }

    /// Closest point on `route`'s polyline to this stop
    pub fn snapped_location(&self, route: RouteIdentifier) -> Option<GeoPoint> {
        self.snapped.get(&route).copied()
    }
}

// ============================================================================
// Position History
// ============================================================================

/// Bounded history of recent positions; the oldest sample goes first.
#[derive(Clone, Debug)]
pub struct PositionHistory {
    samples: VecDeque<GeoPoint>,
    capacity: usize,
}

impl PositionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_HISTORY_LEN);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, point: GeoPoint) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(point);
    }

    pub fn latest(&self) -> Option<GeoPoint> {
        self.samples.back().copied()
    }

    /// Most recent sample that differs from the latest one
    pub fn previous_distinct(&self) -> Option<GeoPoint> {
        let latest = self.latest()?;
        self.samples.iter().rev().skip(1).find(|p| **p != latest).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GeoPoint> + '_ {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Vehicle
// ============================================================================

/// A tracked shuttle.
///
/// Identity is the id alone: two values with the same id are the same
/// vehicle regardless of their other fields.
#[derive(Clone, Debug)]
pub struct Vehicle {
    id: VehicleIdentifier,
    name: Option<Arc<str>>,
    location: GeoPoint,
    speed: f64,
    heading: Option<f64>,
    route_id: Option<RouteIdentifier>,
    history: PositionHistory,
    last_update: DateTime<Utc>,
    etas: HashMap<StopIdentifier, Eta>,
}

/// What happened to a record merged into an existing vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MergeOutcome {
    Merged,
    /// Not newer than what the vehicle already has
    Ignored,
}

impl Vehicle {
    pub(crate) fn from_record(record: VehicleRecord, history_len: usize) -> Self {
        let mut history = PositionHistory::new(history_len);
        history.push(record.location);

        Self {
            id: record.id,
            name: record.name.map(Into::into),
            location: record.location,
            speed: record.speed,
            heading: record.heading.filter(|h| h.is_finite()),
            route_id: None,
            history,
            last_update: record.timestamp,
            etas: HashMap::new(),
        }
    }

    pub(crate) fn merge(&mut self, record: VehicleRecord) -> MergeOutcome {
        debug_assert_eq!(self.id, record.id);
        if record.timestamp <= self.last_update {
            return MergeOutcome::Ignored;
        }

        if let Some(name) = record.name {
            self.name = Some(name.into());
        }
        self.location = record.location;
        self.speed = record.speed;
        self.heading = record.heading.filter(|h| h.is_finite());
        self.last_update = record.timestamp;
        self.history.push(record.location);
        MergeOutcome::Merged
    }

    pub(crate) fn set_route(&mut self, route: Option<RouteIdentifier>) {
        if self.route_id != route {
            self.etas.clear();
        }
        self.route_id = route;
    }

    pub(crate) fn etas_mut(&mut self) -> &mut HashMap<StopIdentifier, Eta> {
        &mut self.etas
    }

    pub fn id(&self) -> VehicleIdentifier {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    /// Miles per hour
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    /// Compass label from the reported heading, or from the last movement
    /// when the feed gave none.
    pub fn heading_label(&self) -> Option<CardinalDirection> {
        let heading = match self.heading {
            Some(heading) => heading,
            None => {
                let from = self.history.previous_distinct()?;
                let to = self.history.latest()?;
                initial_bearing(from, to)
            }
        };
        CardinalDirection::from_degrees(heading)
    }

    pub fn route_id(&self) -> Option<RouteIdentifier> {
        self.route_id
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn etas(&self) -> &HashMap<StopIdentifier, Eta> {
        &self.etas
    }

    pub fn eta(&self, stop: &str) -> Option<Eta> {
        self.etas.get(stop).copied()
    }
}

impl PartialEq for Vehicle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vehicle {}

impl Hash for Vehicle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn vehicle_record(
        id: u64,
        location: GeoPoint,
        speed: f64,
        timestamp: DateTime<Utc>,
    ) -> VehicleRecord {
        VehicleRecord {
            id: VehicleIdentifier::new(id),
            name: None,
            location,
            speed,
            heading: None,
            timestamp,
        }
    }

    pub(crate) fn route(id: u32, points: &[(f64, f64)]) -> Route {
        Route::new(
            RouteIdentifier::new(id),
            format!("Route {id}"),
            points.iter().map(|&(lat, lon)| GeoPoint::new(lat, lon)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_route_requires_two_points() {
        let err = Route::new(RouteIdentifier::new(1), "Short", vec![GeoPoint::new(0.0, 0.0)])
            .unwrap_err();
        assert_eq!(err, RecordError::PolylineTooShort(RouteIdentifier::new(1)));

        let err = Route::new(
            RouteIdentifier::new(2),
            "Broken",
            vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(f64::NAN, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidRoutePoint { .. }));
    }

    #[test]
    fn test_stop_snaps_onto_route() {
        let r1 = route(1, &[(0.0, 0.0), (0.0, 2.0)]);
        let routes: RouteTable = HashMap::from([(r1.id(), Arc::new(r1))]);

        let stop = Stop::resolve(
            StopRecord {
                short_name: "s1".into(),
                name: "Stop One".into(),
                location: GeoPoint::new(0.01, 1.0),
                route_ids: vec![RouteIdentifier::new(1)],
            },
            &routes,
        )
        .unwrap();

        let snapped = stop.snapped_location(RouteIdentifier::new(1)).unwrap();
        assert!(snapped.latitude.abs() < 1e-12);
        assert!((snapped.longitude - 1.0).abs() < 1e-12);
        assert!(stop.serves(RouteIdentifier::new(1)));
        assert!(!stop.serves(RouteIdentifier::new(2)));
    }

    #[test]
    fn test_stop_with_unknown_route_is_rejected() {
        let r1 = route(1, &[(0.0, 0.0), (0.0, 2.0)]);
        let routes: RouteTable = HashMap::from([(r1.id(), Arc::new(r1))]);

        let err = Stop::resolve(
            StopRecord {
                short_name: "s2".into(),
                name: "Stop Two".into(),
                location: GeoPoint::new(0.0, 1.0),
                route_ids: vec![RouteIdentifier::new(1), RouteIdentifier::new(2)],
            },
            &routes,
        )
        .unwrap_err();

        assert_eq!(
            err,
            RecordError::UnknownRoute {
                stop: "s2".into(),
                route: RouteIdentifier::new(2)
            }
        );
    }

    #[test]
    fn test_history_is_a_ring_buffer() {
        let mut history = PositionHistory::new(3);
        for i in 0..5 {
            history.push(GeoPoint::new(0.0, i as f64));
        }

        let longitudes: Vec<f64> = history.iter().map(|p| p.longitude).collect();
        assert_eq!(longitudes, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest(), Some(GeoPoint::new(0.0, 4.0)));
    }

    #[test]
    fn test_history_capacity_is_capped() {
        assert_eq!(PositionHistory::new(50).capacity(), MAX_HISTORY_LEN);
        assert_eq!(PositionHistory::new(0).capacity(), 1);
    }

    #[test]
    fn test_merge_keeps_history_and_ignores_stale_samples() {
        let t0 = Utc::now();
        let record = vehicle_record(1, GeoPoint::new(0.0, 0.0), 10.0, t0);
        let mut vehicle = Vehicle::from_record(record, 10);

        let t1 = t0 + Duration::seconds(5);
        let outcome = vehicle.merge(vehicle_record(1, GeoPoint::new(0.0, 0.1), 12.0, t1));
        assert_eq!(outcome, MergeOutcome::Merged);
        assert_eq!(vehicle.history().len(), 2);
        assert_eq!(vehicle.speed(), 12.0);

        // Same timestamp again: a repeat of the sample already merged
        let outcome = vehicle.merge(vehicle_record(1, GeoPoint::new(0.0, 0.2), 15.0, t1));
        assert_eq!(outcome, MergeOutcome::Ignored);
        assert_eq!(vehicle.history().len(), 2);
        assert_eq!(vehicle.location(), GeoPoint::new(0.0, 0.1));
    }

    #[test]
    fn test_heading_label_falls_back_to_movement() {
        let t0 = Utc::now();
        let record = vehicle_record(1, GeoPoint::new(0.0, 0.0), 10.0, t0);
        let mut vehicle = Vehicle::from_record(record, 10);
        assert_eq!(vehicle.heading_label(), None);

        vehicle.merge(vehicle_record(1, GeoPoint::new(0.0, 0.1), 10.0, t0 + Duration::seconds(5)));
        assert_eq!(vehicle.heading_label(), Some(CardinalDirection::East));

        let t2 = t0 + Duration::seconds(10);
        let mut reported = vehicle_record(1, GeoPoint::new(0.0, 0.2), 10.0, t2);
        reported.heading = Some(180.0);
        vehicle.merge(reported);
        assert_eq!(vehicle.heading_label(), Some(CardinalDirection::South));
    }

    #[test]
    fn test_vehicle_identity_is_id_only() {
        let t0 = Utc::now();
        let a = Vehicle::from_record(vehicle_record(4, GeoPoint::new(0.0, 0.0), 10.0, t0), 10);
        let b = Vehicle::from_record(vehicle_record(4, GeoPoint::new(1.0, 1.0), 30.0, t0), 10);
        let c = Vehicle::from_record(vehicle_record(5, GeoPoint::new(0.0, 0.0), 10.0, t0), 10);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_route_change_clears_etas() {
        let t0 = Utc::now();
        let record = vehicle_record(1, GeoPoint::new(0.0, 0.0), 10.0, t0);
        let mut vehicle = Vehicle::from_record(record, 10);
        vehicle.set_route(Some(RouteIdentifier::new(1)));
        vehicle.etas_mut().insert("s1".into(), Eta::Minutes(3));

        vehicle.set_route(Some(RouteIdentifier::new(1)));
        assert_eq!(vehicle.eta("s1"), Some(Eta::Minutes(3)));

        vehicle.set_route(Some(RouteIdentifier::new(2)));
        assert!(vehicle.etas().is_empty());
    }
}
