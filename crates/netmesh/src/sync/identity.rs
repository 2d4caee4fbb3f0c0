use crate::entity::{EntityId, Identity};

use super::observer::{Observers, SubscriptionId};

/// Holds the locally controlled entity. Empty until the server's identity-setup arrives.
#[derive(Debug, Default)]
pub struct IdentityStore {
    identity: Option<Identity>,
    observers: Observers<Identity>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole record and notifies every subscriber with the new value.
    pub fn set_identity(&mut self, identity: Identity) {
        let identity = self.identity.insert(identity);
        self.observers.notify(identity);
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn id(&self) -> Option<EntityId> {
        self.identity.as_ref().map(|identity| identity.id)
    }

    pub fn is_local(&self, id: EntityId) -> bool {
        self.id() == Some(id)
    }

    /// The callback runs right away with the current identity if one is set, then on every
    /// later `set_identity`.
    pub fn subscribe<F>(&mut self, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&Identity) + 'static,
    {
        if let Some(identity) = &self.identity {
            callback(identity);
        }
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;

    use super::*;
    use crate::entity::{Appearance, EntityState, Rotation};

    fn identity(id: u32, color: u32) -> Identity {
        Identity::new(
            EntityId(id),
            EntityState::new(Appearance::Hex(color), Vec3::ONE, Rotation::IDENTITY),
        )
    }

    #[test]
    fn starts_empty() {
        let store = IdentityStore::new();
        assert!(store.identity().is_none());
        assert_eq!(store.id(), None);
        assert!(!store.is_local(EntityId(1)));
    }

    #[test]
    fn set_replaces_whole_record() {
        let mut store = IdentityStore::new();
        store.set_identity(identity(7, 0xff0000));
        store.set_identity(identity(7, 0x00ff00));

        assert_eq!(store.identity(), Some(&identity(7, 0x00ff00)));
        assert!(store.is_local(EntityId(7)));
    }

    #[test]
    fn subscribers_see_every_update() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = IdentityStore::new();

        let sink = Rc::clone(&seen);
        store.subscribe(move |identity| sink.borrow_mut().push(identity.id));

        store.set_identity(identity(3, 0));
        store.set_identity(identity(4, 0));

        assert_eq!(*seen.borrow(), vec![EntityId(3), EntityId(4)]);
    }

    #[test]
    fn late_subscriber_gets_current_value() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut store = IdentityStore::new();
        store.set_identity(identity(9, 0));

        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |identity| sink.borrow_mut().push(identity.id));
        assert_eq!(*seen.borrow(), vec![EntityId(9)]);

        assert!(store.unsubscribe(sub));
        store.set_identity(identity(10, 0));
        assert_eq!(seen.borrow().len(), 1);
    }
}
