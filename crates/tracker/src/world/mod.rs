//! The authoritative in-memory state: routes, stops and tracked vehicles.
//!
//! All mutation goes through [`World::apply_static_update`],
//! [`World::apply_dynamic_update`] and [`World::run_maintenance`]. Readers
//! get shared immutable routes and stops, and copies of vehicle state.

pub mod snapshot;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::eta::{EtaEstimator, StraightLineEstimator};
use crate::identifiers::*;
use crate::matching::RouteMatcher;
use crate::models::entities::{MergeOutcome, Route, RouteTable, Stop, Vehicle};
use crate::models::records::{RecordError, RouteRecord, StopRecord, VehicleRecord};

pub use snapshot::VehicleSnapshot;

type StopTable = HashMap<StopIdentifier, Arc<Stop>>;

/// Outcome of replacing routes and stops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticRefreshReport {
    pub routes: usize,
    pub stops: usize,
    pub rejected: Vec<RecordError>,
}

/// Outcome of merging one batch of vehicle positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicRefreshReport {
    pub inserted: Vec<VehicleIdentifier>,
    pub merged: Vec<VehicleIdentifier>,
    /// Records no newer than the state already held
    pub ignored: Vec<VehicleIdentifier>,
    pub rejected: Vec<RecordError>,
    pub evicted: Vec<VehicleIdentifier>,
}

#[derive(Debug)]
pub struct World {
    config: TrackerConfig,
    matcher: RouteMatcher,
    estimator: Box<dyn EtaEstimator>,

    routes: RouteTable,
    stops: StopTable,
    vehicles: HashMap<VehicleIdentifier, Vehicle>,
}

impl World {
    pub fn new(config: TrackerConfig) -> Self {
        let matcher = RouteMatcher::from_config(&config);
        Self::with_strategies(config, matcher, Box::new(StraightLineEstimator))
    }

    pub fn with_strategies(
        config: TrackerConfig,
        matcher: RouteMatcher,
        estimator: Box<dyn EtaEstimator>,
    ) -> Self {
        Self {
            config,
            matcher,
            estimator,
            routes: HashMap::new(),
            stops: HashMap::new(),
            vehicles: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // ---- Updates ----

    /// Replace all routes and stops.
    ///
    /// Invalid routes are dropped, then any stop naming a route that did not
    /// make it into the new collection is dropped too. Vehicles stay, but
    /// lose assignments and ETAs that no longer resolve.
    pub fn apply_static_update(
        &mut self,
        routes: Vec<RouteRecord>,
        stops: Vec<StopRecord>,
    ) -> StaticRefreshReport {
        let mut rejected = Vec::new();

        let mut route_table = RouteTable::with_capacity(routes.len());
        for record in routes {
            match Route::from_record(record) {
                Ok(route) => {
                    let id = route.id();
                    if route_table.insert(id, Arc::new(route)).is_some() {
                        warn!(route = %id, "duplicate route in static feed; keeping the later one");
                    }
                }
                Err(e) => {
                    warn!("dropping route: {e}");
                    rejected.push(e);
                }
            }
        }

        let mut stop_table = StopTable::with_capacity(stops.len());
        for record in stops {
            match Stop::resolve(record, &route_table) {
                Ok(stop) => {
                    let short_name = stop.short_name().clone();
                    if stop_table.insert(short_name.clone(), Arc::new(stop)).is_some() {
                        warn!(
                            stop = %short_name,
                            "duplicate stop in static feed; keeping the later one"
                        );
                    }
                }
                Err(e) => {
                    warn!("dropping stop: {e}");
                    rejected.push(e);
                }
            }
        }

        self.routes = route_table;
        self.stops = stop_table;

        for vehicle in self.vehicles.values_mut() {
            if vehicle.route_id().is_some_and(|id| !self.routes.contains_key(&id)) {
                vehicle.set_route(None);
            }
            let route = vehicle.route_id();
            vehicle.etas_mut().retain(|stop, _| {
                route.is_some_and(|route| self.stops.get(stop).is_some_and(|s| s.serves(route)))
            });
        }

        info!(
            routes = self.routes.len(),
            stops = self.stops.len(),
            rejected = rejected.len(),
            "static data refreshed"
        );

        StaticRefreshReport {
            routes: self.routes.len(),
            stops: self.stops.len(),
            rejected,
        }
    }

    /// Merge a batch of position reports, then run maintenance.
    ///
    /// Vehicles missing from the batch are left alone; only staleness
    /// removes them.
    pub fn apply_dynamic_update(
        &mut self,
        vehicles: Vec<VehicleRecord>,
        now: DateTime<Utc>,
    ) -> DynamicRefreshReport {
        let mut report = DynamicRefreshReport::default();

        for record in vehicles {
            if let Err(e) = record.validate() {
                warn!("dropping vehicle report: {e}");
                report.rejected.push(e);
                continue;
            }

            let id = record.id;
            match self.vehicles.get_mut(&id) {
                Some(vehicle) => match vehicle.merge(record) {
                    MergeOutcome::Merged => {
                        debug!(vehicle = %id, location = %vehicle.location(), "merged position");
                        report.merged.push(id);
                    }
                    MergeOutcome::Ignored => report.ignored.push(id),
                },
                None => {
                    debug!(vehicle = %id, "new vehicle");
                    self.vehicles
                        .insert(id, Vehicle::from_record(record, self.config.history_len));
                    report.inserted.push(id);
                }
            }
        }

        report.evicted = self.run_maintenance(now);
        report
    }

    /// Reassign routes, recompute ETAs and evict stale or stray vehicles.
    ///
    /// Returns the evicted ids in ascending order.
    pub fn run_maintenance(&mut self, now: DateTime<Utc>) -> Vec<VehicleIdentifier> {
        for vehicle in self.vehicles.values_mut() {
            self.matcher.update_assignment(vehicle, &self.routes);
            refresh_etas(vehicle, &self.stops, self.estimator.as_ref());
        }

        let threshold = self.config.staleness_threshold();
        let mut evicted = Vec::new();
        self.vehicles.retain(|id, vehicle| {
            let age = now.signed_duration_since(vehicle.last_update());
            if age > threshold {
                info!(vehicle = %id, age_secs = age.num_seconds(), "evicting stale vehicle");
            } else if self.matcher.is_too_far_from_route(vehicle, &self.routes) {
                info!(
                    vehicle = %id,
                    route = ?vehicle.route_id(),
                    "evicting vehicle too far from its route"
                );
            } else {
                return true;
            }
            evicted.push(*id);
            false
        });

        evicted.sort_unstable();
        evicted
    }

    // ---- Read access ----

    pub fn list_routes(&self) -> Vec<Arc<Route>> {
        let mut routes: Vec<_> = self.routes.values().cloned().collect();
        routes.sort_by_key(|r| r.id());
        routes
    }

    pub fn list_stops(&self) -> Vec<Arc<Stop>> {
        let mut stops: Vec<_> = self.stops.values().cloned().collect();
        stops.sort_by(|a, b| a.short_name().cmp(b.short_name()));
        stops
    }

    pub fn list_vehicles(&self) -> Vec<VehicleSnapshot> {
        self.list_vehicles_at(Utc::now())
    }

    /// Vehicle snapshots with ages measured against `now`.
    pub fn list_vehicles_at(&self, now: DateTime<Utc>) -> Vec<VehicleSnapshot> {
        let mut vehicles: Vec<_> = self
            .vehicles
            .values()
            .map(|v| VehicleSnapshot::capture(v, now))
            .collect();
        vehicles.sort_by_key(|v| v.id);
        vehicles
    }

    pub fn route(&self, id: RouteIdentifier) -> Option<Arc<Route>> {
        self.routes.get(&id).cloned()
    }

    pub fn stop(&self, short_name: &str) -> Option<Arc<Stop>> {
        self.stops.get(short_name).cloned()
    }

    pub fn vehicle(&self, id: VehicleIdentifier) -> Option<VehicleSnapshot> {
        self.vehicles
            .get(&id)
            .map(|v| VehicleSnapshot::capture(v, Utc::now()))
    }

    /// Stops served by `route`, ordered by short name.
    pub fn stops_on_route(&self, route: RouteIdentifier) -> Vec<Arc<Stop>> {
        let mut stops: Vec<_> = self
            .stops
            .values()
            .filter(|s| s.serves(route))
            .cloned()
            .collect();
        stops.sort_by(|a, b| a.short_name().cmp(b.short_name()));
        stops
    }
}

/// Recompute the ETA map for every stop on the vehicle's assigned route.
fn refresh_etas(vehicle: &mut Vehicle, stops: &StopTable, estimator: &dyn EtaEstimator) {
    let etas: Vec<_> = match vehicle.route_id() {
        Some(route) => stops
            .values()
            .filter(|stop| stop.serves(route))
            .map(|stop| (stop.short_name().clone(), estimator.estimate(vehicle, stop)))
            .collect(),
        None => Vec::new(),
    };

    let map = vehicle.etas_mut();
    map.clear();
    map.extend(etas);
}
