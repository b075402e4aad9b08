use tracing::{error, warn};

use super::{RepresentationHost, RepresentationKind, Transform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepresentationHandle(pub u64);

#[derive(Debug, Default)]
struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    fn allocate(&mut self) -> RepresentationHandle {
        let handle = RepresentationHandle(self.next);
        self.next = self.next.saturating_add(1);
        handle
    }
}

#[derive(Debug, Clone)]
pub struct Representation {
    pub handle: RepresentationHandle,
    pub kind: RepresentationKind,
    pub label: String,
    pub text: String,
    pub visible: bool,
    pub transform: Transform,
}

#[derive(Debug, Default)]
pub struct HeadlessHost {
    allocator: HandleAllocator,
    representations: Vec<Representation>,
    created_total: u64,
    destroyed_total: u64,
    transform_writes: u64,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    pub fn representation_count(&self) -> usize {
        self.representations.len()
    }

    pub fn find(&self, handle: RepresentationHandle) -> Option<&Representation> {
        self.representations
            .iter()
            .find(|representation| representation.handle == handle)
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Representation> {
        self.representations
            .iter()
            .find(|representation| representation.label == label)
    }

    pub fn visible_count(&self) -> usize {
        self.representations
            .iter()
            .filter(|representation| representation.visible)
            .count()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    pub fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }

    pub fn transform_writes(&self) -> u64 {
        self.transform_writes
    }

    fn find_mut(&mut self, handle: RepresentationHandle) -> Option<&mut Representation> {
        self.representations
            .iter_mut()
            .find(|representation| representation.handle == handle)
    }
}

impl RepresentationHost for HeadlessHost {
    type Handle = RepresentationHandle;

    fn create(&mut self, kind: RepresentationKind, label: &str) -> RepresentationHandle {
        let handle = self.allocator.allocate();
        self.representations.push(Representation {
            handle,
            kind,
            label: label.to_string(),
            text: String::new(),
            visible: false,
            transform: Transform::default(),
        });
        self.created_total = self.created_total.saturating_add(1);
        handle
    }

    fn destroy(&mut self, handle: RepresentationHandle) {
        let before = self.representations.len();
        self.representations
            .retain(|representation| representation.handle != handle);
        if self.representations.len() == before {
            error!(?handle, "destroy_unknown_representation");
            return;
        }
        self.destroyed_total = self.destroyed_total.saturating_add(1);
    }

    fn set_visible(&mut self, handle: RepresentationHandle, visible: bool) {
        match self.find_mut(handle) {
            Some(representation) => representation.visible = visible,
            None => warn!(?handle, "set_visible_unknown_representation"),
        }
    }

    fn set_text(&mut self, handle: RepresentationHandle, text: &str) {
        match self.find_mut(handle) {
            Some(representation) => representation.text = text.to_string(),
            None => warn!(?handle, "set_text_unknown_representation"),
        }
    }

    fn transform(&self, handle: RepresentationHandle) -> Transform {
        match self.find(handle) {
            Some(representation) => representation.transform,
            None => {
                warn!(?handle, "transform_unknown_representation");
                Transform::default()
            }
        }
    }

    fn set_transform(&mut self, handle: RepresentationHandle, transform: Transform) {
        match self.find_mut(handle) {
            Some(representation) => {
                representation.transform = transform;
                self.transform_writes = self.transform_writes.saturating_add(1);
            }
            None => warn!(?handle, "set_transform_unknown_representation"),
        }
    }
}
