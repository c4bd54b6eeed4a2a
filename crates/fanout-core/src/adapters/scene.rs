//! In-memory entity tree implementing every driven port.
//!
//! Components are attached to nodes as `Rc<C>` and made discoverable under a
//! capability with [`InMemoryScene::expose`]. Destroyed components are kept
//! as tombstones so a stale `Rc` held by a registry is still reported
//! destroyed, and so the allocation (and therefore its [`ReceiverKey`]) cannot
//! be reused by a new object while anyone can still present the old key.

use crate::domain::{NodeId, ReceiverKey};
use crate::error::SceneError;
use crate::ports::{ComponentLocator, DestroyedQuery, LivenessFilter, WorldScan};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

struct NodeRecord {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    active_self: bool,
    /// Attached components in attachment order
    components: Vec<ReceiverKey>,
}

struct ComponentRecord {
    /// `None` for free-standing tracked objects
    node: Option<NodeId>,
    enabled: bool,
    /// Keeps the allocation alive while the scene knows the key
    anchor: Rc<dyn Any>,
    /// `Rc<T>` per exposed capability, boxed as `dyn Any`
    capabilities: HashMap<TypeId, Box<dyn Any>>,
}

impl ComponentRecord {
    fn new(node: Option<NodeId>, anchor: Rc<dyn Any>) -> Self {
        Self {
            node,
            enabled: true,
            anchor,
            capabilities: HashMap::new(),
        }
    }

    fn capability<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        self.capabilities
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<Rc<T>>())
            .cloned()
    }
}

#[derive(Default)]
struct SceneState {
    next_node: u64,
    nodes: HashMap<NodeId, NodeRecord>,
    roots: Vec<NodeId>,
    components: HashMap<ReceiverKey, ComponentRecord>,
    /// Tracked objects not attached to any node, in tracking order
    free_standing: Vec<ReceiverKey>,
    tombstones: HashMap<ReceiverKey, Rc<dyn Any>>,
}

impl SceneState {
    fn node(&self, id: NodeId) -> Result<&NodeRecord, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeRecord, SceneError> {
        self.nodes.get_mut(&id).ok_or(SceneError::NodeNotFound(id))
    }

    fn component_mut(&mut self, key: ReceiverKey) -> Result<&mut ComponentRecord, SceneError> {
        if self.tombstones.contains_key(&key) {
            return Err(SceneError::ReceiverDestroyed(key));
        }
        self.components
            .get_mut(&key)
            .ok_or(SceneError::ReceiverNotFound(key))
    }

    fn active_in_hierarchy(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(&id)) {
            if !node.active_self {
                return false;
            }
            current = node.parent;
        }
        self.nodes.contains_key(&id)
    }

    fn eligible(&self, key: ReceiverKey) -> bool {
        if self.tombstones.contains_key(&key) {
            return false;
        }
        match self.components.get(&key) {
            Some(record) => {
                record.enabled && record.node.map_or(true, |node| self.active_in_hierarchy(node))
            }
            None => true,
        }
    }

    fn detach_from_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            Some(parent) => parent.children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }
    }

    /// Unlink a component from its node (or the free-standing list).
    fn unlink(&mut self, key: ReceiverKey, node: Option<NodeId>) {
        match node.and_then(|node| self.nodes.get_mut(&node)) {
            Some(node) => node.components.retain(|component| *component != key),
            None => self.free_standing.retain(|free| *free != key),
        }
    }

    /// Node ids of the subtree rooted at `id`, pre-order.
    ///
    /// Below the root, inactive nodes and their descendants are skipped
    /// unless `include_inactive` is set.
    fn subtree(&self, id: NodeId, include_inactive: bool) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if current != id && !include_inactive && !node.active_self {
                continue;
            }
            order.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    fn collect<T: ?Sized + 'static>(&self, nodes: &[NodeId]) -> Vec<Rc<T>> {
        nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .flat_map(|node| node.components.iter())
            .filter_map(|key| self.components.get(key))
            .filter_map(ComponentRecord::capability::<T>)
            .collect()
    }

    /// Mark a component destroyed, pinning its allocation.
    fn entomb(&mut self, key: ReceiverKey) -> bool {
        match self.components.remove(&key) {
            Some(record) => {
                self.unlink(key, record.node);
                self.tombstones.insert(key, record.anchor);
                true
            }
            None => false,
        }
    }

    /// A destroyed object handed back to the scene is alive again.
    fn revive(&mut self, key: ReceiverKey) {
        self.tombstones.remove(&key);
    }
}

/// Reference scene: a forest of named nodes with attachable components.
///
/// Interior mutability lets receivers reconfigure the scene (enable, destroy,
/// reparent) from inside a handler.
#[derive(Default)]
pub struct InMemoryScene {
    state: RefCell<SceneState>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node, as a root or as the last child of `parent`.
    pub fn spawn(&self, name: &str, parent: Option<NodeId>) -> Result<NodeId, SceneError> {
        let mut state = self.state.borrow_mut();
        let id = NodeId(state.next_node);
        match parent {
            Some(parent) => state.node_mut(parent)?.children.push(id),
            None => state.roots.push(id),
        }
        state.next_node += 1;
        state.nodes.insert(
            id,
            NodeRecord {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                active_self: true,
                components: Vec::new(),
            },
        );
        debug!(node = %id, name, "Node spawned");
        Ok(id)
    }

    pub fn set_active(&self, node: NodeId, active: bool) -> Result<(), SceneError> {
        self.state.borrow_mut().node_mut(node)?.active_self = active;
        Ok(())
    }

    /// Whether the node and every ancestor are active. Unknown nodes are not.
    #[must_use]
    pub fn active_in_hierarchy(&self, node: NodeId) -> bool {
        self.state.borrow().active_in_hierarchy(node)
    }

    /// Move `node` under `parent`, or make it a root.
    pub fn set_parent(&self, node: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        let mut state = self.state.borrow_mut();
        let previous = state.node(node)?.parent;

        if let Some(parent) = parent {
            let mut ancestor = Some(parent);
            while let Some(id) = ancestor {
                if id == node {
                    return Err(SceneError::CycleDetected { node, parent });
                }
                ancestor = state.node(id)?.parent;
            }
        }

        state.detach_from_parent(node, previous);
        match parent {
            Some(parent) => state.node_mut(parent)?.children.push(node),
            None => state.roots.push(node),
        }
        state.node_mut(node)?.parent = parent;
        Ok(())
    }

    /// Remove `node` and its subtree, destroying every attached component.
    ///
    /// Returns the number of components destroyed.
    pub fn despawn(&self, node: NodeId) -> Result<usize, SceneError> {
        let mut state = self.state.borrow_mut();
        let parent = state.node(node)?.parent;
        let doomed = state.subtree(node, true);

        let mut destroyed = 0;
        for id in &doomed {
            let Some(record) = state.nodes.remove(id) else {
                continue;
            };
            for key in record.components {
                if let Some(component) = state.components.remove(&key) {
                    state.tombstones.insert(key, component.anchor);
                    destroyed += 1;
                }
            }
        }
        state.detach_from_parent(node, parent);

        debug!(node = %node, nodes = doomed.len(), destroyed, "Node despawned");
        Ok(destroyed)
    }

    #[must_use]
    pub fn name(&self, node: NodeId) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(&node)
            .map(|record| record.name.clone())
    }

    #[must_use]
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.state.borrow().nodes.get(&node).and_then(|record| record.parent)
    }

    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.state.borrow().nodes.contains_key(&node)
    }

    /// Attach `component` to `node`, enabled, and expose it under its own
    /// concrete type.
    ///
    /// Attaching a component the scene already knows moves it to `node`,
    /// keeping its exposed capabilities and enabled flag.
    pub fn attach<C: 'static>(&self, node: NodeId, component: Rc<C>) -> Result<ReceiverKey, SceneError> {
        let key = ReceiverKey::of_rc(&component);
        let mut state = self.state.borrow_mut();
        state.node(node)?;
        state.revive(key);

        let previous = state.components.get(&key).map(|record| record.node);
        if let Some(previous) = previous {
            state.unlink(key, previous);
        }
        let anchor: Rc<dyn Any> = component.clone();
        let record = state
            .components
            .entry(key)
            .or_insert_with(|| ComponentRecord::new(Some(node), anchor));
        record.node = Some(node);
        record
            .capabilities
            .insert(TypeId::of::<C>(), Box::new(component));
        state.node_mut(node)?.components.push(key);

        debug!(node = %node, receiver = %key, "Component attached");
        Ok(key)
    }

    /// Start tracking the liveness of an object that lives outside the tree.
    ///
    /// Tracked objects can be enabled, disabled and destroyed like attached
    /// components, and show up in world scans after every attached one.
    pub fn track<C: 'static>(&self, object: Rc<C>) -> ReceiverKey {
        let key = ReceiverKey::of_rc(&object);
        let mut state = self.state.borrow_mut();
        state.revive(key);
        if !state.components.contains_key(&key) {
            let anchor: Rc<dyn Any> = object.clone();
            let mut record = ComponentRecord::new(None, anchor);
            record
                .capabilities
                .insert(TypeId::of::<C>(), Box::new(object));
            state.components.insert(key, record);
            state.free_standing.push(key);
        }
        key
    }

    /// Make a known object discoverable under capability `T`.
    ///
    /// `handle` must point at the same allocation as `key`; this is how a
    /// concrete component is viewed as `dyn T`.
    pub fn expose<T: ?Sized + 'static>(&self, key: ReceiverKey, handle: Rc<T>) -> Result<(), SceneError> {
        let actual = ReceiverKey::of_rc(&handle);
        if actual != key {
            return Err(SceneError::KeyMismatch {
                expected: key,
                actual,
            });
        }
        self.state
            .borrow_mut()
            .component_mut(key)?
            .capabilities
            .insert(TypeId::of::<T>(), Box::new(handle));
        Ok(())
    }

    pub fn set_enabled(&self, key: ReceiverKey, enabled: bool) -> Result<(), SceneError> {
        self.state.borrow_mut().component_mut(key)?.enabled = enabled;
        Ok(())
    }

    #[must_use]
    pub fn is_enabled(&self, key: ReceiverKey) -> bool {
        self.state
            .borrow()
            .components
            .get(&key)
            .is_some_and(|record| record.enabled)
    }

    /// Detach a component and mark it destroyed.
    pub fn destroy(&self, key: ReceiverKey) -> Result<(), SceneError> {
        let mut state = self.state.borrow_mut();
        if state.tombstones.contains_key(&key) {
            return Err(SceneError::ReceiverDestroyed(key));
        }
        if !state.entomb(key) {
            return Err(SceneError::ReceiverNotFound(key));
        }
        debug!(receiver = %key, "Component destroyed");
        Ok(())
    }

    /// Forget destroyed objects no one else holds any more.
    ///
    /// Returns the number of tombstones released.
    /// Released objects are dropped after the scene borrow ends, so their
    /// `Drop` may call back into the scene.
    pub fn purge_tombstones(&self) -> usize {
        let released: Vec<Rc<dyn Any>> = {
            let mut state = self.state.borrow_mut();
            let unreferenced: Vec<ReceiverKey> = state
                .tombstones
                .iter()
                .filter(|(_, anchor)| Rc::strong_count(anchor) == 1)
                .map(|(key, _)| *key)
                .collect();
            unreferenced
                .iter()
                .filter_map(|key| state.tombstones.remove(key))
                .collect()
        };
        released.len()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.state.borrow().tombstones.len()
    }
}

impl ComponentLocator for InMemoryScene {
    fn attached<T: ?Sized + 'static>(&self, node: NodeId) -> Vec<Rc<T>> {
        self.state.borrow().collect::<T>(&[node])
    }

    fn attached_in_subtree<T: ?Sized + 'static>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
    ) -> Vec<Rc<T>> {
        let state = self.state.borrow();
        if !include_inactive_nodes && !state.active_in_hierarchy(node) {
            return Vec::new();
        }
        let nodes = state.subtree(node, include_inactive_nodes);
        state.collect::<T>(&nodes)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent_of(node)
    }
}

impl LivenessFilter for InMemoryScene {
    fn is_eligible(&self, receiver: ReceiverKey) -> bool {
        self.state.borrow().eligible(receiver)
    }
}

impl DestroyedQuery for InMemoryScene {
    fn is_destroyed(&self, receiver: ReceiverKey) -> bool {
        self.state.borrow().tombstones.contains_key(&receiver)
    }
}

impl WorldScan for InMemoryScene {
    fn find_all<T: ?Sized + 'static>(&self) -> Vec<Rc<T>> {
        let state = self.state.borrow();
        let nodes: Vec<NodeId> = state
            .roots
            .iter()
            .flat_map(|root| state.subtree(*root, true))
            .collect();
        let mut found = state.collect::<T>(&nodes);
        found.extend(
            state
                .free_standing
                .iter()
                .filter_map(|key| state.components.get(key))
                .filter_map(ComponentRecord::capability::<T>),
        );
        found
    }
}
