mod bootstrap;
mod loop_runner;
mod replay;

use std::env;
use std::path::PathBuf;

use replica::{EntitySync, HeadlessHost, SnapshotFeed, SyncSession};
use tracing::info;

pub use bootstrap::init_tracing;
pub use loop_runner::{ReplayError, ReplayReport};

use bootstrap::load_config;
use loop_runner::{run_replay, LoopConfig};
use replay::{read_payloads, resolve_feed_interval, FEED_PATH_ENV_VAR};

pub fn run() -> Result<ReplayReport, ReplayError> {
    let config = load_config()?;
    let feed_path = match env::var(FEED_PATH_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => return Err(ReplayError::MissingFeedPath),
    };
    let payloads = read_payloads(&feed_path)?;
    info!(
        path = %feed_path.display(),
        payload_count = payloads.len(),
        "feed_loaded"
    );

    let loop_config = LoopConfig {
        feed_interval: resolve_feed_interval(LoopConfig::default().feed_interval),
        ..LoopConfig::default()
    };
    let feed = SnapshotFeed::new();
    let session = SyncSession::attach(&feed, EntitySync::new(&config, HeadlessHost::new())?);
    run_replay(&loop_config, &feed, session, payloads)
}
