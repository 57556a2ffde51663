//! Great-circle geometry and polyline indexing.

pub mod index;
pub mod queries;

pub use index::SegmentIndex;
pub use queries::{
    degrees_to_miles, haversine_distance, haversine_distance_to_line, initial_bearing,
    miles_to_degrees, EARTH_RADIUS_MILES,
};
