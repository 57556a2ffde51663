//! Tunables for the tracking core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::matching::{RouteDistance, SegmentDistance, VertexDistance};
use crate::models::entities::MAX_HISTORY_LEN;
use crate::models::types::{Result, TrackerError};

/// How the route matcher measures distance to a route.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMetric {
    /// Nearest polyline vertex
    #[default]
    Vertex,
    /// Nearest point on any polyline segment
    Segment,
}

impl RouteMetric {
    pub fn build(self) -> Box<dyn RouteDistance> {
        match self {
            RouteMetric::Vertex => Box::new(VertexDistance),
            RouteMetric::Segment => Box::new(SegmentDistance),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Seconds between vehicle feed refreshes
    pub poll_interval_secs: u64,
    /// Seconds between route/stop feed refreshes
    pub static_refresh_interval_secs: u64,
    /// A vehicle silent for longer than this is evicted
    pub staleness_threshold_secs: u64,
    /// A vehicle farther than this from its route is evicted
    pub max_route_distance_miles: f64,
    /// Routes whose distances differ by at most this are tied
    pub tie_tolerance_degrees: f64,
    pub history_len: usize,
    pub route_metric: RouteMetric,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            static_refresh_interval_secs: 60 * 60,
            staleness_threshold_secs: 60,
            max_route_distance_miles: 10.0,
            tie_tolerance_degrees: 5e-4,
            history_len: MAX_HISTORY_LEN,
            route_metric: RouteMetric::Vertex,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn static_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.static_refresh_interval_secs)
    }

    pub fn staleness_threshold(&self) -> chrono::Duration {
        i64::try_from(self.staleness_threshold_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(TrackerError::InvalidConfig("poll_interval_secs must be positive".into()));
        }
        if self.static_refresh_interval_secs == 0 {
            return Err(TrackerError::InvalidConfig(
                "static_refresh_interval_secs must be positive".into(),
            ));
        }
        if self.history_len == 0 || self.history_len > MAX_HISTORY_LEN {
            return Err(TrackerError::InvalidConfig(format!(
                "history_len must be between 1 and {}, got {}",
                MAX_HISTORY_LEN, self.history_len
            )));
        }
        if !(self.max_route_distance_miles.is_finite() && self.max_route_distance_miles >= 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "max_route_distance_miles must be a non-negative number, got {}",
                self.max_route_distance_miles
            )));
        }
        if !(self.tie_tolerance_degrees.is_finite() && self.tie_tolerance_degrees >= 0.0) {
            return Err(TrackerError::InvalidConfig(format!(
                "tie_tolerance_degrees must be a non-negative number, got {}",
                self.tie_tolerance_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.staleness_threshold(), chrono::Duration::seconds(60));
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{ "staleness_threshold_secs": 45, "route_metric": "segment" }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.staleness_threshold_secs, 45);
        assert_eq!(config.route_metric, RouteMetric::Segment);
        assert_eq!(config.history_len, MAX_HISTORY_LEN);
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        let bad = [
            TrackerConfig { poll_interval_secs: 0, ..Default::default() },
            TrackerConfig { history_len: 11, ..Default::default() },
            TrackerConfig { history_len: 0, ..Default::default() },
            TrackerConfig { tie_tolerance_degrees: -1.0, ..Default::default() },
            TrackerConfig { max_route_distance_miles: f64::NAN, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(TrackerError::InvalidConfig(_))), "{config:?}");
        }
    }
}
