//! Periodic refresh of the shared world.
//!
//! Two independent loops drive the world: a rare static refresh (routes and
//! stops) and a frequent dynamic refresh (vehicle positions). Feeds are
//! fetched without holding the lock; the write lock covers only the merge and
//! maintenance step, so readers never wait behind a slow feed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::models::types::Result;
use crate::network::traits::{EtaSink, FeedSource};
use crate::world::{DynamicRefreshReport, StaticRefreshReport, World};

pub type SharedWorld = Arc<RwLock<World>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cycle {
    Static,
    Dynamic,
}

#[derive(Clone)]
pub struct Scheduler {
    world: SharedWorld,
    source: Arc<dyn FeedSource>,
    sink: Option<Arc<dyn EtaSink>>,
    poll_interval: Duration,
    static_refresh_interval: Duration,
}

impl Scheduler {
    pub fn new(world: SharedWorld, source: Arc<dyn FeedSource>, config: &TrackerConfig) -> Self {
        Self {
            world,
            source,
            sink: None,
            poll_interval: config.poll_interval(),
            static_refresh_interval: config.static_refresh_interval(),
        }
    }

    /// Publish vehicle snapshots to `sink` after every dynamic refresh.
    pub fn with_sink(mut self, sink: Arc<dyn EtaSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    /// Fetch routes and stops and replace them in the world.
    ///
    /// A failed fetch leaves the world untouched.
    pub async fn refresh_static(&self) -> Result<StaticRefreshReport> {
        let feed = self.source.fetch_static().await?;

        let mut world = self.world.write().await;
        Ok(world.apply_static_update(feed.routes, feed.stops))
    }

    /// Fetch vehicle positions, merge them and run maintenance.
    ///
    /// A failed fetch leaves the world untouched. Sink failures are logged
    /// and do not fail the refresh.
    pub async fn refresh_dynamic(&self) -> Result<DynamicRefreshReport> {
        let records = self.source.fetch_dynamic().await?;

        let (report, snapshots) = {
            let mut world = self.world.write().await;
            let now = Utc::now();
            let report = world.apply_dynamic_update(records, now);
            (report, world.list_vehicles_at(now))
        };

        debug!(
            inserted = report.inserted.len(),
            merged = report.merged.len(),
            ignored = report.ignored.len(),
            rejected = report.rejected.len(),
            evicted = report.evicted.len(),
            "vehicle positions refreshed"
        );

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.publish(&snapshots).await {
                warn!("failed to publish ETAs: {e}");
            }
        }

        Ok(report)
    }

    /// Run an initial static refresh, then spawn both refresh loops.
    pub async fn start(self) -> SchedulerHandle {
        if let Err(e) = self.refresh_static().await {
            warn!("initial static refresh failed; retrying on the next interval: {e}");
        }

        let (shutdown, receiver) = watch::channel(false);
        let tasks = vec![
            tokio::spawn(self.clone().run(Cycle::Static, receiver.clone())),
            tokio::spawn(self.run(Cycle::Dynamic, receiver)),
        ];

        info!("refresh scheduler started");
        SchedulerHandle { shutdown, tasks }
    }

    async fn run(self, cycle: Cycle, mut shutdown: watch::Receiver<bool>) {
        let period = match cycle {
            Cycle::Static => self.static_refresh_interval,
            Cycle::Dynamic => self.poll_interval,
        };
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Shutdown is only observed between refreshes.
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            let outcome = match cycle {
                Cycle::Static => self.refresh_static().await.map(drop),
                Cycle::Dynamic => {
                    self.retry_missing_static().await;
                    self.refresh_dynamic().await.map(drop)
                }
            };
            if let Err(e) = outcome {
                warn!(?cycle, "refresh failed; keeping last known state: {e}");
            }
        }

        debug!(?cycle, "refresh loop stopped");
    }

    /// Retry the static feed on the poll interval while the world has no
    /// routes; until then every vehicle would be evicted as off-route.
    async fn retry_missing_static(&self) {
        let has_routes = !self.world.read().await.list_routes().is_empty();
        if has_routes {
            return;
        }

        match self.refresh_static().await {
            Ok(report) => info!(routes = report.routes, "static data loaded on retry"),
            Err(e) => warn!("static refresh retry failed: {e}"),
        }
    }
}

/// Running refresh loops.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop both loops, letting any in-flight refresh finish first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("refresh task ended abnormally: {e}");
            }
        }
        info!("refresh scheduler stopped");
    }
}
