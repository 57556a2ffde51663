//! ETA sink that writes arrival times to the log.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Duration, Utc};
use shuttle_tracker::prelude::*;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Absolute arrival time at each stop with a known ETA.
    pub fn arrivals(
        vehicle: &VehicleSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<(StopIdentifier, DateTime<Utc>)> {
        vehicle
            .etas
            .iter()
            .filter_map(|(stop, eta)| {
                let minutes = eta.minutes()?;
                Some((stop.clone(), now + Duration::minutes(i64::from(minutes))))
            })
            .collect()
    }
}

impl EtaSink for LogSink {
    fn publish<'a>(
        &'a self,
        vehicles: &'a [VehicleSnapshot],
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let now = Utc::now();
            for vehicle in vehicles {
                let name = vehicle.name.as_deref().unwrap_or("unnamed");
                let heading = vehicle.heading.map_or("unknown", CardinalDirection::label);

                let arrivals = Self::arrivals(vehicle, now);
                if arrivals.is_empty() {
                    debug!(
                        vehicle = %vehicle.id,
                        name,
                        route = ?vehicle.route_id,
                        "no arrival estimates"
                    );
                    continue;
                }
                for (stop, arrival) in arrivals {
                    info!(
                        vehicle = %vehicle.id,
                        name,
                        heading,
                        stop = %stop,
                        arrival = %arrival.format("%H:%M:%S"),
                        "arrival estimate"
                    );
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(etas: &[(&str, Eta)], now: DateTime<Utc>) -> VehicleSnapshot {
        VehicleSnapshot {
            id: VehicleIdentifier::new(4),
            name: Some("Bus 4".into()),
            location: GeoPoint::new(42.73, -73.68),
            speed: 15.0,
            heading: Some(CardinalDirection::North),
            route_id: Some(RouteIdentifier::new(1)),
            etas: etas
                .iter()
                .map(|(stop, eta)| (StopIdentifier::from(*stop), *eta))
                .collect::<BTreeMap<_, _>>(),
            last_update: now,
            age_secs: 0,
            history_len: 1,
        }
    }

    #[test]
    fn test_arrivals_skip_unknown_etas() {
        let now = Utc::now();
        let etas = [
            ("union", Eta::Minutes(7)),
            ("barh", Eta::Unknown),
            ("blitman", Eta::Minutes(0)),
        ];
        let vehicle = snapshot(&etas, now);

        let arrivals = LogSink::arrivals(&vehicle, now);
        assert_eq!(
            arrivals,
            vec![
                (StopIdentifier::from("blitman"), now),
                (StopIdentifier::from("union"), now + Duration::minutes(7)),
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_never_fails() {
        let now = Utc::now();
        let vehicles = [snapshot(&[("union", Eta::Minutes(3))], now), snapshot(&[], now)];
        assert!(LogSink.publish(&vehicles).await.is_ok());
    }
}
