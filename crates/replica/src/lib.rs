//! Reconciles a live feed of per-entity snapshots against host-owned visual
//! representations and interpolates them toward their latest observed state.

pub mod config;
pub mod feed;
pub mod interpolation;
mod lock;
pub mod mapping;
pub mod metrics;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;
pub mod team;

pub use config::{ConfigError, SyncConfig, INTERPOLATION_ENV_VAR};
pub use feed::{FeedSubscription, SnapshotFeed};
pub use interpolation::{InterpolationScheduler, InterpolationState, TaskToken};
pub use mapping::{facing_rotation, map_forward, map_position, Calibration, MapFrame};
pub use metrics::{MetricsHandle, SyncMetricsSnapshot};
pub use reconcile::{
    reconcile, MalformedEntityPolicy, ReconcilePlan, ReconcileSummary, TrackedEntity,
};
pub use session::{PumpSummary, SyncSession};
pub use snapshot::{
    EntityId, EntitySnapshot, ParseError, ParsedSnapshot, RejectReason, SnapshotParser,
    DEFAULT_HEALTH,
};
pub use store::{
    HeadlessHost, Representation, RepresentationHandle, RepresentationHost, RepresentationKind,
    RepresentationStore, Transform,
};
pub use sync::{spawn_label, update_label, EntitySync};
pub use team::{Team, TeamTable};

pub use glam::{Quat, Vec3};
