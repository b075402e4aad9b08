use tracing::{debug, warn};

use crate::feed::{FeedSubscription, SnapshotFeed};
use crate::metrics::{MetricsHandle, SyncMetricsSnapshot};
use crate::store::RepresentationHost;
use crate::sync::EntitySync;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub applied: usize,
    pub dropped: usize,
}

#[derive(Debug)]
pub struct SyncSession<H: RepresentationHost> {
    sync: EntitySync<H>,
    subscription: FeedSubscription,
    metrics: MetricsHandle,
    counters: SyncMetricsSnapshot,
}

impl<H: RepresentationHost> SyncSession<H> {
    pub fn attach(feed: &SnapshotFeed, sync: EntitySync<H>) -> Self {
        Self {
            sync,
            subscription: feed.subscribe(),
            metrics: MetricsHandle::default(),
            counters: SyncMetricsSnapshot::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Applies every payload received since the last pump, oldest first.
    pub fn pump(&mut self) -> PumpSummary {
        let mut summary = PumpSummary::default();
        for payload in self.subscription.drain() {
            match self.sync.on_snapshot(&payload) {
                Ok(reconciled) => {
                    summary.applied += 1;
                    self.counters.payloads_applied += 1;
                    self.counters.entities_rejected += reconciled.rejected as u64;
                    self.counters.spawned_total += reconciled.spawned as u64;
                    self.counters.despawned_total += reconciled.despawned as u64;
                    debug!(
                        spawned = reconciled.spawned,
                        updated = reconciled.updated,
                        despawned = reconciled.despawned,
                        rejected = reconciled.rejected,
                        "snapshot_applied"
                    );
                }
                Err(error) => {
                    summary.dropped += 1;
                    self.counters.payloads_dropped += 1;
                    warn!(error = %error, payload_len = payload.len(), "snapshot_dropped");
                }
            }
        }
        self.publish_metrics();
        summary
    }

    pub fn advance(&mut self, dt: f32) -> PumpSummary {
        let summary = self.pump();
        self.sync.tick(dt);
        self.publish_metrics();
        summary
    }

    pub fn sync(&self) -> &EntitySync<H> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut EntitySync<H> {
        &mut self.sync
    }

    pub fn metrics(&self) -> MetricsHandle {
        self.metrics.clone()
    }

    pub fn shutdown(self) -> H {
        let Self {
            mut sync,
            subscription,
            metrics,
            mut counters,
        } = self;
        drop(subscription);
        let removed = sync.despawn_all();
        counters.despawned_total += removed as u64;
        counters.tracked_entities = 0;
        counters.active_interpolations = 0;
        metrics.publish(counters);
        debug!(removed, "sync_session_shutdown");
        sync.into_host()
    }

    fn publish_metrics(&mut self) {
        self.counters.tracked_entities = self.sync.tracked_count();
        self.counters.active_interpolations = self.sync.active_interpolations();
        self.metrics.publish(self.counters);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::SyncConfig;
    use crate::store::HeadlessHost;

    fn session(feed: &SnapshotFeed) -> SyncSession<HeadlessHost> {
        SyncSession::attach(
            feed,
            EntitySync::new(&SyncConfig::default(), HeadlessHost::default())
                .expect("valid config"),
        )
    }

    #[test]
    fn pump_applies_queued_payloads_in_order() {
        let feed = SnapshotFeed::new();
        let mut session = session(&feed);
        feed.publish(json!({ "p1": ["0, 0, 0", "Alice", "A", 100, "1, 0, 0"] }).to_string());
        feed.publish(json!({}).to_string());

        let summary = session.pump();

        assert_eq!(summary, PumpSummary { applied: 2, dropped: 0 });
        assert_eq!(session.sync().tracked_count(), 0);
        let metrics = session.metrics().snapshot();
        assert_eq!(metrics.spawned_total, 1);
        assert_eq!(metrics.despawned_total, 1);
    }

    #[test]
    fn malformed_payload_is_dropped_and_counted() {
        let feed = SnapshotFeed::new();
        let mut session = session(&feed);
        feed.publish(json!({ "p1": ["0, 0, 0", "Alice", "A", 100, "1, 0, 0"] }).to_string());
        feed.publish("{ truncated");

        let summary = session.advance(0.016);

        assert_eq!(summary, PumpSummary { applied: 1, dropped: 1 });
        assert_eq!(session.sync().tracked_count(), 1);
        let metrics = session.metrics().snapshot();
        assert_eq!(metrics.payloads_dropped, 1);
        assert_eq!(metrics.tracked_entities, 1);
    }

    #[test]
    fn shutdown_unsubscribes_and_releases_representations() {
        let feed = SnapshotFeed::new();
        let metrics = MetricsHandle::default();
        let mut session = session(&feed).with_metrics(metrics.clone());
        feed.publish(json!({ "p1": ["0, 0, 0", "Alice", "A", 100, "1, 0, 0"] }).to_string());
        session.pump();

        let host = session.shutdown();

        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(host.representation_count(), 0);
        assert_eq!(host.destroyed_total(), 1);
        assert_eq!(metrics.snapshot().tracked_entities, 0);
    }
}
