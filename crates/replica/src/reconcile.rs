use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::snapshot::{EntityId, ParsedSnapshot};
use crate::team::Team;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedEntityPolicy {
    /// The payload is authoritative: a rejected entry counts as absent.
    #[default]
    Despawn,
    /// Keep the representation at its last known state until a well-formed
    /// entry or a real absence arrives.
    RetainLastKnown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub name: String,
    pub team: Team,
    pub health: i32,
    pub alive: bool,
}

#[derive(Debug, Default)]
pub(crate) struct EntityTable {
    entities: HashMap<EntityId, TrackedEntity>,
}

impl EntityTable {
    pub(crate) fn ids(&self) -> HashSet<EntityId> {
        self.entities.keys().cloned().collect()
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.entities.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &EntityId) -> Option<&mut TrackedEntity> {
        self.entities.get_mut(id)
    }

    pub(crate) fn insert(&mut self, entity: TrackedEntity) {
        self.entities.insert(entity.id.clone(), entity);
    }

    pub(crate) fn remove(&mut self, id: &EntityId) -> Option<TrackedEntity> {
        self.entities.remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &TrackedEntity> {
        self.entities.values()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub spawns: Vec<EntityId>,
    pub updates: Vec<EntityId>,
    pub despawns: Vec<EntityId>,
    pub retained: Vec<EntityId>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty()
            && self.updates.is_empty()
            && self.despawns.is_empty()
            && self.retained.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub spawned: usize,
    pub updated: usize,
    pub despawned: usize,
    pub retained: usize,
    pub rejected: usize,
}

pub fn reconcile(
    previous: &HashSet<EntityId>,
    incoming: &ParsedSnapshot,
    policy: MalformedEntityPolicy,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for id in previous {
        if incoming.contains(id) {
            plan.updates.push(id.clone());
        } else if policy == MalformedEntityPolicy::RetainLastKnown && incoming.is_rejected(id) {
            plan.retained.push(id.clone());
        } else {
            plan.despawns.push(id.clone());
        }
    }
    plan.spawns.extend(
        incoming
            .ids()
            .filter(|id| !previous.contains(*id))
            .cloned(),
    );

    plan.spawns.sort();
    plan.updates.sort();
    plan.despawns.sort();
    plan.retained.sort();
    plan
}
