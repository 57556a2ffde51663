//! Pluggable collaborator traits.
//!
//! External crates implement these to fetch feed data and to consume the
//! computed ETAs. The core never parses a wire format or opens a connection.

use std::future::Future;
use std::pin::Pin;

use crate::models::records::{StaticFeed, VehicleRecord};
use crate::models::types::Result;
use crate::world::VehicleSnapshot;

/// Source of decoded route, stop and vehicle records.
///
/// Implementations bound every fetch with their own timeout and report
/// failures as `FeedUnavailable` or `FeedMalformed`.
pub trait FeedSource: Send + Sync {
    /// Routes and stops
    fn fetch_static<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<StaticFeed>> + Send + 'a>>;

    /// Latest vehicle positions
    fn fetch_dynamic<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<VehicleRecord>>> + Send + 'a>>;
}

/// Consumer of the vehicle state after each refresh (persistence, display).
pub trait EtaSink: Send + Sync {
    fn publish<'a>(
        &'a self,
        vehicles: &'a [VehicleSnapshot],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
