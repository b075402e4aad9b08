use std::sync::{Arc, Mutex};

use crate::lock::lock_or_recover;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncMetricsSnapshot {
    pub payloads_applied: u64,
    pub payloads_dropped: u64,
    pub entities_rejected: u64,
    pub spawned_total: u64,
    pub despawned_total: u64,
    pub tracked_entities: usize,
    pub active_interpolations: usize,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<Mutex<SyncMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        *lock_or_recover(&self.latest, "sync_metrics")
    }

    pub(crate) fn publish(&self, counters: SyncMetricsSnapshot) {
        *lock_or_recover(&self.latest, "sync_metrics") = counters;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::poison;

    #[test]
    fn every_clone_reads_the_latest_counters() {
        let session_side = MetricsHandle::default();
        let loop_side = session_side.clone();
        let counters = SyncMetricsSnapshot {
            payloads_applied: 3,
            tracked_entities: 2,
            ..SyncMetricsSnapshot::default()
        };

        session_side.publish(counters);

        assert_eq!(loop_side.snapshot(), counters);
    }

    #[test]
    fn counters_survive_a_panicked_publisher() {
        let handle = MetricsHandle::default();
        let counters = SyncMetricsSnapshot {
            payloads_dropped: 4,
            spawned_total: 9,
            ..SyncMetricsSnapshot::default()
        };
        handle.publish(counters);
        poison(&handle.latest);

        assert_eq!(handle.snapshot(), counters);
        handle.publish(SyncMetricsSnapshot::default());
        assert_eq!(handle.snapshot(), SyncMetricsSnapshot::default());
    }
}
