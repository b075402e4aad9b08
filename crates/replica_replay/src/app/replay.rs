use std::env;
use std::fs;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use replica::SnapshotFeed;
use tracing::{debug, warn};

use super::loop_runner::ReplayError;

pub const FEED_PATH_ENV_VAR: &str = "REPLICA_FEED_PATH";
pub const FEED_INTERVAL_ENV_VAR: &str = "REPLICA_FEED_INTERVAL_MS";

pub fn read_payloads(path: &Path) -> Result<Vec<String>, ReplayError> {
    let raw = fs::read_to_string(path).map_err(|source| ReplayError::ReadFeed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Publishes `payloads` from a dedicated thread, one every `interval`.
/// The thread yields the number of payloads it published.
pub fn spawn_publisher(
    feed: SnapshotFeed,
    payloads: Vec<String>,
    interval: Duration,
) -> Result<JoinHandle<usize>, ReplayError> {
    thread::Builder::new()
        .name("replica-feed".to_string())
        .spawn(move || {
            let mut published = 0usize;
            for payload in payloads {
                let delivered = feed.publish(payload);
                published += 1;
                debug!(sequence = published, delivered, "payload_published");
                thread::sleep(interval);
            }
            published
        })
        .map_err(|source| ReplayError::SpawnPublisher { source })
}

pub(crate) fn resolve_feed_interval(fallback: Duration) -> Duration {
    match env::var(FEED_INTERVAL_ENV_VAR) {
        Ok(value) => parse_feed_interval(&value).unwrap_or_else(|| {
            warn!(
                env_var = FEED_INTERVAL_ENV_VAR,
                value = value.as_str(),
                "invalid feed interval env var value; falling back to default"
            );
            fallback
        }),
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var = FEED_INTERVAL_ENV_VAR,
                error = %err,
                "unable to read feed interval env var; falling back to default"
            );
            fallback
        }
    }
}

fn parse_feed_interval(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_millis)
}
