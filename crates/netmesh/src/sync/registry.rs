use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::entity::{EntityId, EntityState, Transform};

use super::observer::{Observers, SubscriptionId};

/// Something the renderer owns whose transform the registry may overwrite.
///
/// The registry only ever holds a reference to a target; it never creates or drops the
/// object behind it. Returns false when the target can no longer be written.
pub trait TransformTarget {
    fn apply_transform(&mut self, transform: &Transform) -> bool;
}

impl<T: TransformTarget> TransformTarget for Rc<RefCell<T>> {
    fn apply_transform(&mut self, transform: &Transform) -> bool {
        match self.try_borrow_mut() {
            Ok(mut target) => target.apply_transform(transform),
            Err(_) => false,
        }
    }
}

impl<T: TransformTarget> TransformTarget for Weak<RefCell<T>> {
    fn apply_transform(&mut self, transform: &Transform) -> bool {
        match self.upgrade() {
            Some(mut target) => target.apply_transform(transform),
            None => false,
        }
    }
}

impl TransformTarget for Transform {
    fn apply_transform(&mut self, transform: &Transform) -> bool {
        *self = *transform;
        true
    }
}

#[derive(Debug, Clone)]
pub struct RemoteEntity<H> {
    pub state: EntityState,
    pub handle: Option<H>,
}

impl<H> RemoteEntity<H> {
    pub fn new(state: EntityState) -> Self {
        Self {
            state,
            handle: None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.handle.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    Joined { id: EntityId, replaced: bool },
    HandleAttached { id: EntityId },
    Moved { id: EntityId },
    Evicted { id: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    Applied,
    UnknownEntity,
    NotMaterialized,
    TargetGone,
}

/// Remote entities keyed by server id.
#[derive(Debug)]
pub struct Registry<H> {
    entities: HashMap<EntityId, RemoteEntity<H>>,
    observers: Observers<RegistryEvent>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            observers: Observers::new(),
        }
    }

    /// Inserts or fully replaces the entry for `id`. Any handle the previous entry held is
    /// dropped from the registry along with it; the old entry is returned.
    pub fn join(&mut self, id: EntityId, state: EntityState) -> Option<RemoteEntity<H>> {
        self.insert(id, RemoteEntity::new(state))
    }

    pub fn join_with_handle(
        &mut self,
        id: EntityId,
        state: EntityState,
        handle: H,
    ) -> Option<RemoteEntity<H>> {
        self.insert(
            id,
            RemoteEntity {
                state,
                handle: Some(handle),
            },
        )
    }

    fn insert(&mut self, id: EntityId, entity: RemoteEntity<H>) -> Option<RemoteEntity<H>> {
        let previous = self.entities.insert(id, entity);
        self.observers.notify(&RegistryEvent::Joined {
            id,
            replaced: previous.is_some(),
        });
        previous
    }

    /// Returns false, dropping `handle`, when no entry exists for `id`.
    pub fn attach_handle(&mut self, id: EntityId, handle: H) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.handle = Some(handle);
        self.observers.notify(&RegistryEvent::HandleAttached { id });
        true
    }

    pub fn detach_handle(&mut self, id: EntityId) -> Option<H> {
        self.entities.get_mut(&id)?.handle.take()
    }

    pub fn get(&self, id: EntityId) -> Option<&RemoteEntity<H>> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn read(&self) -> &HashMap<EntityId, RemoteEntity<H>> {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &RemoteEntity<H>)> {
        self.entities.iter().map(|(&id, entity)| (id, entity))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&RegistryEvent) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub(crate) fn evict(&mut self, id: EntityId) -> Option<RemoteEntity<H>> {
        let entity = self.entities.remove(&id)?;
        self.observers.notify(&RegistryEvent::Evicted { id });
        Some(entity)
    }
}

impl<H: TransformTarget> Registry<H> {
    /// Writes `transform` into the entity's materialized handle. Unknown ids and entries
    /// without a handle are left exactly as they are.
    pub fn apply_remote_transform(&mut self, id: EntityId, transform: &Transform) -> TransformOutcome {
        let Some(entity) = self.entities.get_mut(&id) else {
            return TransformOutcome::UnknownEntity;
        };
        let Some(handle) = entity.handle.as_mut() else {
            return TransformOutcome::NotMaterialized;
        };
        if !handle.apply_transform(transform) {
            return TransformOutcome::TargetGone;
        }

        entity.state.transform = *transform;
        self.observers.notify(&RegistryEvent::Moved { id });
        TransformOutcome::Applied
    }
}
