//! Server configuration, read from a JSON file.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use shuttle_tracker::config::TrackerConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Routes and stops
    pub static_feed_url: String,
    /// Latest vehicle positions
    pub dynamic_feed_url: String,
    pub fetch_timeout_secs: u64,
    pub tracker: TrackerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            static_feed_url: "http://shuttles.rpi.edu/displays/netlink.js".to_owned(),
            dynamic_feed_url: "http://shuttles.rpi.edu/vehicles/current.js".to_owned(),
            fetch_timeout_secs: 10,
            tracker: TrackerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.static_feed_url.trim().is_empty() || self.dynamic_feed_url.trim().is_empty() {
            bail!("feed URLs must not be empty");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        self.tracker.validate()?;
        Ok(())
    }
}

pub async fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: ServerConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
