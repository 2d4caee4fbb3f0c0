use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use netmesh::{Appearance, EntityId, EntityState, Transform, TransformTarget};

/// Headless stand-in for a renderable mesh.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub appearance: Appearance,
    pub transform: Transform,
    pub updates: u64,
}

impl TransformTarget for SceneNode {
    fn apply_transform(&mut self, transform: &Transform) -> bool {
        self.transform = *transform;
        self.updates += 1;
        true
    }
}

pub type NodeHandle = Weak<RefCell<SceneNode>>;

/// Owns every materialized node. The registry only ever sees weak handles.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<EntityId, Rc<RefCell<SceneNode>>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the node for `id`, replacing any node a previous sighting left behind.
    pub fn materialize(&mut self, id: EntityId, state: &EntityState) -> NodeHandle {
        let node = Rc::new(RefCell::new(SceneNode {
            appearance: state.appearance.clone(),
            transform: state.transform,
            updates: 0,
        }));
        let handle = Rc::downgrade(&node);

        if self.nodes.insert(id, node).is_some() {
            log::debug!("Replaced scene node for {}", id);
        } else {
            log::debug!("Materialized {} as {:?}", id, state.appearance);
        }

        handle
    }

    pub fn get(&self, id: EntityId) -> Option<Rc<RefCell<SceneNode>>> {
        self.nodes.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn total_updates(&self) -> u64 {
        self.nodes.values().map(|node| node.borrow().updates).sum()
    }
}
