mod headless;

use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
use tracing::{debug, error};

use crate::snapshot::EntityId;
use crate::team::Team;

pub use headless::{HeadlessHost, Representation, RepresentationHandle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    TeamA,
    TeamB,
}

/// Calls arrive only through [`RepresentationStore`], so a host never sees a
/// handle destroyed twice or mutated after destruction. Visibility of a newly
/// created object is host-defined; the store's callers always set it.
pub trait RepresentationHost {
    type Handle: Copy + Eq + fmt::Debug;

    fn create(&mut self, kind: RepresentationKind, label: &str) -> Self::Handle;
    fn destroy(&mut self, handle: Self::Handle);
    fn set_visible(&mut self, handle: Self::Handle, visible: bool);
    fn set_text(&mut self, handle: Self::Handle, text: &str);
    fn transform(&self, handle: Self::Handle) -> Transform;
    fn set_transform(&mut self, handle: Self::Handle, transform: Transform);
}

#[derive(Debug)]
pub struct RepresentationStore<H: RepresentationHost> {
    host: H,
    handles: HashMap<EntityId, H::Handle>,
}

impl<H: RepresentationHost> RepresentationStore<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            handles: HashMap::new(),
        }
    }

    pub fn spawn(&mut self, id: &EntityId, team: Team, label: &str) -> H::Handle {
        if let Some(existing) = self.handles.get(id) {
            error!(entity = %id, handle = ?existing, "representation_already_spawned");
            return *existing;
        }
        let handle = self.host.create(team.representation_kind(), label);
        self.handles.insert(id.clone(), handle);
        debug!(entity = %id, ?handle, ?team, "representation_created");
        handle
    }

    /// Releases the entity's representation. Returns false when nothing was
    /// held for `id`, in which case the host is not called.
    pub fn destroy(&mut self, id: &EntityId) -> bool {
        let Some(handle) = self.handles.remove(id) else {
            return false;
        };
        self.host.destroy(handle);
        debug!(entity = %id, ?handle, "representation_destroyed");
        true
    }

    pub fn set_visible(&mut self, id: &EntityId, visible: bool) -> bool {
        let Some(handle) = self.handles.get(id).copied() else {
            return false;
        };
        self.host.set_visible(handle, visible);
        true
    }

    pub fn set_text(&mut self, id: &EntityId, text: &str) -> bool {
        let Some(handle) = self.handles.get(id).copied() else {
            return false;
        };
        self.host.set_text(handle, text);
        true
    }

    pub fn transform(&self, id: &EntityId) -> Option<Transform> {
        self.handles
            .get(id)
            .map(|handle| self.host.transform(*handle))
    }

    pub fn set_transform(&mut self, id: &EntityId, transform: Transform) -> bool {
        let Some(handle) = self.handles.get(id).copied() else {
            return false;
        };
        self.host.set_transform(handle, transform);
        true
    }

    pub fn handle(&self, id: &EntityId) -> Option<H::Handle> {
        self.handles.get(id).copied()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.handles.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.handles.keys()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }
}
