use std::collections::HashMap;

use tracing::{trace, warn};

use crate::snapshot::EntityId;
use crate::store::{RepresentationHost, RepresentationStore, Transform};

pub const DEFAULT_INTERPOLATION_SECONDS: f32 = 0.3;

/// Identifies one interpolation task instance. A token stops being live as
/// soon as its task completes, is canceled, or is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskToken(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpolationState {
    Idle,
    Interpolating { fraction: f32 },
    Completed,
}

#[derive(Debug, Clone, Copy)]
struct InterpolationTask {
    token: TaskToken,
    start: Transform,
    target: Transform,
    elapsed: f32,
    duration: f32,
}

impl InterpolationTask {
    fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }

    fn sample(&self, fraction: f32) -> Transform {
        Transform {
            position: self.start.position.lerp(self.target.position, fraction),
            rotation: self.start.rotation.slerp(self.target.rotation, fraction),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TaskSlot {
    Running(InterpolationTask),
    Completed,
}

#[derive(Debug, Default)]
pub struct InterpolationScheduler {
    slots: HashMap<EntityId, TaskSlot>,
    next_token: u64,
}

impl InterpolationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts moving `id` from `start` to `target`, replacing any running
    /// task for the same entity. Nothing is written until the next tick.
    pub fn start(
        &mut self,
        id: &EntityId,
        start: Transform,
        target: Transform,
        duration: f32,
    ) -> TaskToken {
        if let Some(previous) = self.cancel(id) {
            trace!(entity = %id, ?previous, "interpolation_preempted");
        }
        let token = TaskToken(self.next_token);
        self.next_token = self.next_token.saturating_add(1);
        let duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.slots.insert(
            id.clone(),
            TaskSlot::Running(InterpolationTask {
                token,
                start,
                target,
                elapsed: 0.0,
                duration,
            }),
        );
        token
    }

    /// Stops the running task for `id`, leaving its transform wherever the
    /// last tick put it.
    pub fn cancel(&mut self, id: &EntityId) -> Option<TaskToken> {
        match self.slots.get(id) {
            Some(TaskSlot::Running(task)) => {
                let token = task.token;
                self.slots.remove(id);
                Some(token)
            }
            _ => None,
        }
    }

    pub fn forget(&mut self, id: &EntityId) -> Option<TaskToken> {
        match self.slots.remove(id)? {
            TaskSlot::Running(task) => Some(task.token),
            TaskSlot::Completed => None,
        }
    }

    pub fn is_live(&self, token: TaskToken) -> bool {
        self.slots
            .values()
            .any(|slot| matches!(slot, TaskSlot::Running(task) if task.token == token))
    }

    pub fn state(&self, id: &EntityId) -> InterpolationState {
        match self.slots.get(id) {
            None => InterpolationState::Idle,
            Some(TaskSlot::Running(task)) => InterpolationState::Interpolating {
                fraction: task.fraction(),
            },
            Some(TaskSlot::Completed) => InterpolationState::Completed,
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, TaskSlot::Running(_)))
            .count()
    }

    /// Returns how many tasks finished on this tick.
    pub fn tick<H: RepresentationHost>(
        &mut self,
        dt: f32,
        store: &mut RepresentationStore<H>,
    ) -> usize {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let mut completed = 0usize;

        self.slots.retain(|id, slot| {
            let TaskSlot::Running(task) = slot else {
                return true;
            };
            task.elapsed += dt;
            let fraction = task.fraction();
            let finished = fraction >= 1.0;
            // The final write is the exact target, not a sample at 1.0.
            let transform = if finished {
                task.target
            } else {
                task.sample(fraction)
            };
            if !store.set_transform(id, transform) {
                warn!(entity = %id, "interpolation_target_missing");
                return false;
            }
            if finished {
                *slot = TaskSlot::Completed;
                completed += 1;
            }
            true
        });

        completed
    }
}
