use std::collections::HashSet;

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, SyncConfig};
use crate::interpolation::{InterpolationScheduler, InterpolationState};
use crate::mapping::{facing_rotation, map_forward, map_position, Calibration, MapFrame};
use crate::reconcile::{
    reconcile, EntityTable, MalformedEntityPolicy, ReconcileSummary, TrackedEntity,
};
use crate::snapshot::{EntityId, EntitySnapshot, ParseError, ParsedSnapshot, SnapshotParser};
use crate::store::{RepresentationHost, RepresentationStore, Transform};

pub fn spawn_label(name: &str, health: i32) -> String {
    format!("{name} ({health} HP)")
}

pub fn update_label(name: &str, health: i32) -> String {
    format!("{name}({health})")
}

#[derive(Debug)]
pub struct EntitySync<H: RepresentationHost> {
    parser: SnapshotParser,
    calibration: Calibration,
    frame: MapFrame,
    interpolation_duration: f32,
    policy: MalformedEntityPolicy,
    table: EntityTable,
    store: RepresentationStore<H>,
    scheduler: InterpolationScheduler,
}

impl<H: RepresentationHost> EntitySync<H> {
    pub fn new(config: &SyncConfig, host: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            parser: SnapshotParser::new(config.teams.clone()),
            calibration: config.calibration(),
            frame: MapFrame {
                map_scale: Vec3::from_array(config.reference_scale),
                ..MapFrame::default()
            },
            interpolation_duration: config.interpolation_duration,
            policy: config.malformed_entity_policy,
            table: EntityTable::default(),
            store: RepresentationStore::new(host),
            scheduler: InterpolationScheduler::new(),
        })
    }

    /// Full ingestion cycle for one raw payload. A payload that fails to parse
    /// leaves every tracked entity untouched.
    pub fn on_snapshot(&mut self, payload: &str) -> Result<ReconcileSummary, ParseError> {
        let parsed = self.parser.parse(payload)?;
        Ok(self.apply_snapshot(&parsed))
    }

    pub fn apply_snapshot(&mut self, incoming: &ParsedSnapshot) -> ReconcileSummary {
        let previous = self.table.ids();
        let plan = reconcile(&previous, incoming, self.policy);
        let mut summary = ReconcileSummary {
            retained: plan.retained.len(),
            rejected: incoming.rejected_count(),
            ..ReconcileSummary::default()
        };

        for id in &plan.despawns {
            if self.despawn(id) {
                summary.despawned += 1;
            }
        }
        for id in &plan.spawns {
            if let Some(snapshot) = incoming.get(id) {
                self.spawn(snapshot);
                summary.spawned += 1;
            }
        }
        for id in &plan.updates {
            if let Some(snapshot) = incoming.get(id) {
                self.update(snapshot);
                summary.updated += 1;
            }
        }
        for id in &plan.retained {
            debug!(entity = %id, "malformed_entity_retained");
        }

        summary
    }

    pub fn tick(&mut self, dt: f32) -> usize {
        self.scheduler.tick(dt, &mut self.store)
    }

    pub fn set_map_frame(&mut self, frame: MapFrame) {
        self.frame = frame;
    }

    pub fn map_frame(&self) -> MapFrame {
        self.frame
    }

    pub fn tracked(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.table.get(id)
    }

    pub fn tracked_ids(&self) -> HashSet<EntityId> {
        self.table.ids()
    }

    pub fn tracked_count(&self) -> usize {
        self.table.len()
    }

    pub fn alive_count(&self) -> usize {
        self.table.values().filter(|entity| entity.alive).count()
    }

    pub fn interpolation_state(&self, id: &EntityId) -> InterpolationState {
        self.scheduler.state(id)
    }

    pub fn active_interpolations(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn store(&self) -> &RepresentationStore<H> {
        &self.store
    }

    pub fn host(&self) -> &H {
        self.store.host()
    }

    pub fn despawn_all(&mut self) -> usize {
        let mut removed = 0;
        for id in self.table.ids() {
            if self.despawn(&id) {
                removed += 1;
            }
        }
        removed
    }

    pub fn into_host(self) -> H {
        self.store.into_host()
    }

    fn target_transform(&self, snapshot: &EntitySnapshot) -> Transform {
        let forward = map_forward(snapshot.raw_forward, &self.frame);
        Transform {
            position: map_position(snapshot.raw_position, &self.frame, &self.calibration),
            rotation: facing_rotation(forward),
        }
    }

    fn spawn(&mut self, snapshot: &EntitySnapshot) {
        let target = self.target_transform(snapshot);
        let id = &snapshot.id;
        let alive = snapshot.is_alive();

        let handle = self.store.spawn(id, snapshot.team, &snapshot.name);
        self.store.set_transform(id, target);
        self.store
            .set_text(id, &spawn_label(&snapshot.name, snapshot.health));
        // First sighting may already be dead: tracked, but starts hidden.
        self.store.set_visible(id, alive);
        self.table.insert(TrackedEntity {
            id: id.clone(),
            name: snapshot.name.clone(),
            team: snapshot.team,
            health: snapshot.health,
            alive,
        });

        info!(
            entity = %id,
            name = snapshot.name.as_str(),
            team = ?snapshot.team,
            ?handle,
            health = snapshot.health,
            "entity_spawned"
        );
    }

    fn update(&mut self, snapshot: &EntitySnapshot) {
        let target = self.target_transform(snapshot);
        let id = &snapshot.id;
        let Some(tracked) = self.table.get_mut(id) else {
            warn!(entity = %id, "update_for_untracked_entity");
            return;
        };

        if tracked.team != snapshot.team {
            debug!(
                entity = %id,
                team = ?tracked.team,
                observed = ?snapshot.team,
                "team_change_ignored"
            );
        }
        let alive = snapshot.is_alive();
        if alive != tracked.alive {
            debug!(entity = %id, alive, health = snapshot.health, "entity_liveness_changed");
        }
        tracked.name.clone_from(&snapshot.name);
        tracked.health = snapshot.health;
        tracked.alive = alive;

        self.store.set_visible(id, alive);
        self.store
            .set_text(id, &update_label(&snapshot.name, snapshot.health));

        let start = self.store.transform(id).unwrap_or(target);
        self.scheduler
            .start(id, start, target, self.interpolation_duration);
    }

    fn despawn(&mut self, id: &EntityId) -> bool {
        let canceled = self.scheduler.forget(id);
        let destroyed = self.store.destroy(id);
        let removed = self.table.remove(id).is_some();
        if destroyed || removed {
            info!(entity = %id, interpolation_canceled = canceled.is_some(), "entity_despawned");
        }
        destroyed || removed
    }
}
