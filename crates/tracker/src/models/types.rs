//! Core value types and errors for tracking data.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Value Types
// ============================================================================

/// A geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within the latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<GeoPoint> for geo::Point {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

impl From<geo::Point> for GeoPoint {
    fn from(p: geo::Point) -> Self {
        Self::new(p.y(), p.x())
    }
}

impl From<GeoPoint> for geo::Coord {
    fn from(p: GeoPoint) -> Self {
        geo::Coord { x: p.longitude, y: p.latitude }
    }
}

/// Arrival estimate at a stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eta {
    /// Whole minutes remaining, rounded down.
    Minutes(u32),
    Unknown,
}

impl Eta {
    pub fn minutes(self) -> Option<u32> {
        match self {
            Eta::Minutes(m) => Some(m),
            Eta::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Eta::Minutes(_))
    }
}

/// Compass label for a vehicle's heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardinalDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CardinalDirection {
    const ALL: [CardinalDirection; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Nearest compass point for a heading in degrees clockwise from north.
    pub fn from_degrees(heading: f64) -> Option<Self> {
        if !heading.is_finite() {
            return None;
        }
        let normalized = heading.rem_euclid(360.0);
        let sector = ((normalized + 22.5) / 45.0).floor() as usize % 8;
        Some(Self::ALL[sector])
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::NorthEast => "North-East",
            Self::East => "East",
            Self::SouthEast => "South-East",
            Self::South => "South",
            Self::SouthWest => "South-West",
            Self::West => "West",
            Self::NorthWest => "North-West",
        }
    }
}

impl fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Feed malformed: {0}")]
    FeedMalformed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ETA sink failed: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(42.73, -73.68).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
        assert!(!GeoPoint::new(f64::INFINITY, 0.0).is_valid());
    }

    #[test]
    fn test_geo_point_axis_order() {
        let point: geo::Point = GeoPoint::new(42.0, -73.0).into();
        assert_eq!(point.x(), -73.0);
        assert_eq!(point.y(), 42.0);
        assert_eq!(GeoPoint::from(point), GeoPoint::new(42.0, -73.0));
    }

    #[test]
    fn test_cardinal_direction_from_degrees() {
        assert_eq!(CardinalDirection::from_degrees(0.0), Some(CardinalDirection::North));
        assert_eq!(CardinalDirection::from_degrees(359.0), Some(CardinalDirection::North));
        assert_eq!(CardinalDirection::from_degrees(136.0), Some(CardinalDirection::SouthEast));
        assert_eq!(CardinalDirection::from_degrees(-90.0), Some(CardinalDirection::West));
        assert_eq!(CardinalDirection::from_degrees(f64::NAN), None);
        assert_eq!(CardinalDirection::SouthEast.to_string(), "South-East");
    }

    #[test]
    fn test_eta_accessors() {
        assert_eq!(Eta::Minutes(4).minutes(), Some(4));
        assert_eq!(Eta::Unknown.minutes(), None);
        assert!(!Eta::Unknown.is_known());
    }
}
