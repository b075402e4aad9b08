use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use replica::{ConfigError, HeadlessHost, SnapshotFeed, SyncMetricsSnapshot, SyncSession};
use thiserror::Error;
use tracing::{info, warn};

use super::replay::spawn_publisher;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub feed_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            feed_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("REPLICA_FEED_PATH is not set; point it at a newline-delimited payload file")]
    MissingFeedPath,
    #[error("failed to read feed file {path}: {source}")]
    ReadFeed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn feed publisher thread: {source}")]
    SpawnPublisher {
        #[source]
        source: std::io::Error,
    },
    #[error("feed publisher thread panicked")]
    PublisherPanicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayReport {
    pub frames: u64,
    pub ticks: u64,
    pub payloads_published: usize,
    pub remaining_representations: usize,
    pub metrics: SyncMetricsSnapshot,
}

pub fn run_replay(
    config: &LoopConfig,
    feed: &SnapshotFeed,
    mut session: SyncSession<HeadlessHost>,
    payloads: Vec<String>,
) -> Result<ReplayReport, ReplayError> {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        feed_interval_ms = config.feed_interval.as_millis() as u64,
        "loop_config"
    );

    let mut publisher = Some(spawn_publisher(
        feed.clone(),
        payloads,
        config.feed_interval,
    )?);
    let mut payloads_published = 0usize;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_metrics_log = last_frame_instant;
    let mut frames = 0u64;
    let mut ticks = 0u64;

    loop {
        let now = Instant::now();
        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
        last_frame_instant = now;
        accumulator = accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        accumulator = step_plan.remaining_accumulator;
        if !step_plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_backlog_dropped"
            );
        }
        for _ in 0..step_plan.ticks_to_run {
            session.advance(fixed_dt_seconds);
        }
        ticks = ticks.saturating_add(u64::from(step_plan.ticks_to_run));
        frames = frames.saturating_add(1);

        if now.saturating_duration_since(last_metrics_log) >= metrics_log_interval {
            last_metrics_log = now;
            log_metrics(&session);
        }

        if publisher.as_ref().is_some_and(|handle| handle.is_finished()) {
            if let Some(handle) = publisher.take() {
                payloads_published = handle.join().map_err(|_| ReplayError::PublisherPanicked)?;
                info!(payloads_published, "feed_exhausted");
                session.pump();
            }
        }
        if publisher.is_none() && session.sync().active_interpolations() == 0 {
            break;
        }

        thread::sleep(fixed_dt);
    }

    log_metrics(&session);
    let remaining_representations = session.sync().host().representation_count();
    let metrics_handle = session.metrics();
    session.shutdown();
    info!("shutdown");

    Ok(ReplayReport {
        frames,
        ticks,
        payloads_published,
        remaining_representations,
        metrics: metrics_handle.snapshot(),
    })
}

fn log_metrics(session: &SyncSession<HeadlessHost>) {
    let snapshot = session.metrics().snapshot();
    info!(
        payloads_applied = snapshot.payloads_applied,
        payloads_dropped = snapshot.payloads_dropped,
        entities_rejected = snapshot.entities_rejected,
        tracked_entities = snapshot.tracked_entities,
        alive_entities = session.sync().alive_count(),
        active_interpolations = snapshot.active_interpolations,
        spawned_total = snapshot.spawned_total,
        despawned_total = snapshot.despawned_total,
        "sync_metrics"
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use replica::{EntitySync, SyncConfig};

    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), max_frame_delta),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn zero_durations_fall_back() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn replay_runs_until_feed_is_exhausted_and_motion_settles() {
        let config = SyncConfig {
            interpolation_duration: 0.05,
            ..SyncConfig::default()
        };
        let feed = SnapshotFeed::new();
        let sync = EntitySync::new(&config, HeadlessHost::new()).expect("valid config");
        let session = SyncSession::attach(&feed, sync);
        let payloads = vec![
            r#"{"p1": ["0, 0, 0", "Alice", "A", 100, "1, 0, 0"]}"#.to_string(),
            "{ not json".to_string(),
            r#"{"p1": ["500, 0, 0", "Alice", "A", 80, "1, 0, 0"]}"#.to_string(),
        ];
        let loop_config = LoopConfig {
            target_tps: 200,
            feed_interval: Duration::from_millis(2),
            ..LoopConfig::default()
        };

        let report = run_replay(&loop_config, &feed, session, payloads).expect("replay");

        assert_eq!(report.payloads_published, 3);
        assert_eq!(report.metrics.payloads_applied, 2);
        assert_eq!(report.metrics.payloads_dropped, 1);
        assert_eq!(report.metrics.spawned_total, 1);
        assert_eq!(report.remaining_representations, 1);
        assert_eq!(report.metrics.tracked_entities, 0);
        assert_eq!(feed.subscriber_count(), 0);
    }
}
