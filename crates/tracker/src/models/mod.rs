//! Tracking data models, records, and errors.

pub mod entities;
pub mod records;
pub mod types;

// Re-exports for convenience
pub use entities::{PositionHistory, Route, RouteTable, Stop, Vehicle, MAX_HISTORY_LEN};
pub use records::{RecordError, RouteRecord, StaticFeed, StopRecord, VehicleRecord};
pub use types::{CardinalDirection, Eta, GeoPoint, Result, TrackerError};
