//! HTTP client for the shuttle display feeds.
//!
//! The static feed (`netlink.js`) carries routes with their coordinates and
//! the stops each route serves. The vehicle feed (`current.js`) is an array of
//! `{"vehicle": {...}}` entries with the latest reported position. Numeric
//! fields show up both as JSON numbers and as numeric strings.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shuttle_tracker::prelude::*;
use tracing::{debug, warn};

/// Format of `latest_position.timestamp`, e.g. `2011-04-29 20:02:13 -0400`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    fn integer(&self) -> Option<u64> {
        match self {
            Numeric::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u64::MAX as f64 => {
                Some(*n as u64)
            }
            Numeric::Number(_) => None,
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NetlinkFeed {
    #[serde(default)]
    routes: Vec<NetlinkRoute>,
    #[serde(default)]
    stops: Vec<NetlinkStop>,
}

#[derive(Debug, Deserialize)]
struct NetlinkRoute {
    id: Numeric,
    name: String,
    #[serde(default)]
    coords: Vec<NetlinkCoord>,
}

#[derive(Debug, Deserialize)]
struct NetlinkCoord {
    latitude: Numeric,
    longitude: Numeric,
}

#[derive(Debug, Deserialize)]
struct NetlinkStop {
    latitude: Numeric,
    longitude: Numeric,
    name: String,
    short_name: String,
    #[serde(default)]
    routes: Vec<NetlinkStopRoute>,
}

#[derive(Debug, Deserialize)]
struct NetlinkStopRoute {
    id: Numeric,
}

#[derive(Debug, Deserialize)]
struct VehicleEntry {
    vehicle: FeedVehicle,
}

#[derive(Debug, Deserialize)]
struct FeedVehicle {
    id: Numeric,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    latest_position: Option<FeedPosition>,
}

#[derive(Debug, Deserialize)]
struct FeedPosition {
    latitude: Numeric,
    longitude: Numeric,
    #[serde(default)]
    heading: Option<Numeric>,
    #[serde(default)]
    speed: Option<Numeric>,
    timestamp: String,
}

fn point(latitude: &Numeric, longitude: &Numeric) -> GeoPoint {
    // Unparseable coordinates become NaN so the tracker rejects the record.
    GeoPoint::new(
        latitude.value().unwrap_or(f64::NAN),
        longitude.value().unwrap_or(f64::NAN),
    )
}

fn route_id(id: &Numeric) -> Option<RouteIdentifier> {
    id.integer()
        .and_then(|id| u32::try_from(id).ok())
        .map(RouteIdentifier::new)
}

// ============================================================================
// Decoding
// ============================================================================

pub fn decode_static(body: &[u8]) -> Result<StaticFeed> {
    let feed: NetlinkFeed =
        serde_json::from_slice(body).map_err(|e| TrackerError::FeedMalformed(e.to_string()))?;

    let routes = feed
        .routes
        .into_iter()
        .filter_map(|route| {
            let Some(id) = route_id(&route.id) else {
                warn!(route = ?route.id, "skipping route with invalid id");
                return None;
            };
            Some(RouteRecord {
                id,
                name: route.name,
                polyline: route
                    .coords
                    .iter()
                    .map(|c| point(&c.latitude, &c.longitude))
                    .collect(),
            })
        })
        .collect();

    let stops = feed
        .stops
        .into_iter()
        .filter_map(|stop| {
            let route_ids: Option<Vec<_>> = stop.routes.iter().map(|r| route_id(&r.id)).collect();
            let Some(route_ids) = route_ids else {
                warn!(stop = %stop.short_name, "skipping stop with invalid route id");
                return None;
            };
            Some(StopRecord {
                location: point(&stop.latitude, &stop.longitude),
                short_name: stop.short_name.into(),
                name: stop.name,
                route_ids,
            })
        })
        .collect();

    Ok(StaticFeed { routes, stops })
}

pub fn decode_vehicles(body: &[u8]) -> Result<Vec<VehicleRecord>> {
    let entries: Vec<VehicleEntry> =
        serde_json::from_slice(body).map_err(|e| TrackerError::FeedMalformed(e.to_string()))?;

    Ok(entries
        .into_iter()
        .filter_map(|entry| vehicle_record(entry.vehicle))
        .collect())
}

fn vehicle_record(vehicle: FeedVehicle) -> Option<VehicleRecord> {
    let Some(id) = vehicle.id.integer() else {
        warn!(vehicle = ?vehicle.id, "skipping vehicle with invalid id");
        return None;
    };
    let Some(position) = vehicle.latest_position else {
        debug!(vehicle = id, "vehicle has no position yet");
        return None;
    };
    let timestamp = match DateTime::parse_from_str(&position.timestamp, TIMESTAMP_FORMAT) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(
                vehicle = id,
                timestamp = %position.timestamp,
                "skipping vehicle with bad timestamp: {e}"
            );
            return None;
        }
    };

    Some(VehicleRecord {
        id: VehicleIdentifier::new(id),
        name: vehicle.name,
        location: point(&position.latitude, &position.longitude),
        speed: position
            .speed
            .as_ref()
            .map_or(Some(0.0), Numeric::value)
            .unwrap_or(f64::NAN),
        heading: position.heading.as_ref().and_then(Numeric::value),
        timestamp,
    })
}

// ============================================================================
// HTTP Feed
// ============================================================================

pub struct HttpFeed {
    client: reqwest::Client,
    static_url: String,
    dynamic_url: String,
}

impl HttpFeed {
    pub fn new(
        static_url: impl Into<String>,
        dynamic_url: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            static_url: static_url.into(),
            dynamic_url: dynamic_url.into(),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let unavailable = |e: reqwest::Error| TrackerError::FeedUnavailable(format!("{url}: {e}"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(unavailable)?;
        let body = response.bytes().await.map_err(unavailable)?;

        debug!(url, bytes = body.len(), "fetched feed");
        Ok(body.to_vec())
    }
}

impl FeedSource for HttpFeed {
    fn fetch_static<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<StaticFeed>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.get(&self.static_url).await?;
            decode_static(&body)
        })
    }

    fn fetch_dynamic<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VehicleRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.get(&self.dynamic_url).await?;
            decode_vehicles(&body)
        })
    }
}
