use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpawnPolicy {
    /// An id already waiting in the queue is not queued a second time.
    #[default]
    DedupPending,
    AllowDuplicates,
}

/// Ids the renderer still has to materialize, in the order they must be materialized.
#[derive(Debug, Default)]
pub struct SpawnQueue {
    pending: VecDeque<EntityId>,
    policy: SpawnPolicy,
}

impl SpawnQueue {
    pub fn new(policy: SpawnPolicy) -> Self {
        Self {
            pending: VecDeque::new(),
            policy,
        }
    }

    pub fn policy(&self) -> SpawnPolicy {
        self.policy
    }

    /// Returns false if the policy kept `id` out of the queue.
    pub fn push(&mut self, id: EntityId) -> bool {
        if self.policy == SpawnPolicy::DedupPending && self.pending.contains(&id) {
            return false;
        }
        self.pending.push_back(id);
        true
    }

    pub fn drain_and_clear(&mut self) -> Vec<EntityId> {
        self.pending.drain(..).collect()
    }

    /// Removes every pending occurrence of `id`.
    pub fn cancel(&mut self, id: EntityId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| *pending != id);
        self.pending.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.pending.iter().copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.pending.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
