//! # shuttle-tracker
//!
//! Live shuttle tracking: route assignment, arrival estimates and vehicle
//! lifecycle over periodically refreshed feeds.
//!
//! ## Features
//!
//! - **Route matching**: assign each vehicle to the closest route, with
//!   hysteresis on ties
//! - **Arrival estimates**: per-stop ETAs from distance and current speed
//! - **Eviction**: drop vehicles that go silent or stray from their route
//! - **Spatial queries**: R-tree backed snapping onto route polylines
//! - **Pluggable feeds**: implement [`FeedSource`] and [`EtaSink`] for your
//!   own transport and storage
//!
//! ## Example
//!
//! ```
//! use shuttle_tracker::prelude::*;
//! use chrono::Utc;
//!
//! let mut world = World::new(TrackerConfig::default());
//! world.apply_static_update(
//!     vec![RouteRecord {
//!         id: RouteIdentifier::new(1),
//!         name: "West Campus".into(),
//!         polyline: vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 0.1)],
//!     }],
//!     vec![StopRecord {
//!         short_name: "union".into(),
//!         name: "Student Union".into(),
//!         location: GeoPoint::new(0.0, 0.1),
//!         route_ids: vec![RouteIdentifier::new(1)],
//!     }],
//! );
//!
//! let now = Utc::now();
//! world.apply_dynamic_update(
//!     vec![VehicleRecord {
//!         id: VehicleIdentifier::new(7),
//!         name: Some("Bus 7".into()),
//!         location: GeoPoint::new(0.0, 0.0),
//!         speed: 20.0,
//!         heading: Some(90.0),
//!         timestamp: now,
//!     }],
//!     now,
//! );
//!
//! let bus = world.vehicle(VehicleIdentifier::new(7)).unwrap();
//! assert_eq!(bus.route_id, Some(RouteIdentifier::new(1)));
//! assert_eq!(bus.heading, Some(CardinalDirection::East));
//! assert!(bus.eta("union").unwrap().is_known());
//! ```

pub mod config;
pub mod eta;
pub mod identifiers;
pub mod matching;
pub mod models;
pub mod network;
pub mod scheduler;
pub mod spatial;
pub mod world;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{RouteMetric, TrackerConfig};
    pub use crate::eta::{EtaEstimator, StraightLineEstimator};
    pub use crate::identifiers::*;
    pub use crate::matching::{RouteDistance, RouteMatcher, SegmentDistance, VertexDistance};
    pub use crate::models::{entities::*, records::*, types::*};
    pub use crate::network::traits::*;
    pub use crate::scheduler::{Scheduler, SchedulerHandle, SharedWorld};
    pub use crate::world::{DynamicRefreshReport, StaticRefreshReport, VehicleSnapshot, World};
}

pub use prelude::*;
