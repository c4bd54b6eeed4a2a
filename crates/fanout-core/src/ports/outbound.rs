//! Outbound Ports (Driven Ports)
//!
//! What the dispatch core needs from the host environment: the entity tree,
//! liveness bookkeeping, destroyed-object detection and a world scan.
//!
//! Capability types are traits used as `dyn Capability`; every query is
//! generic over `T: ?Sized + 'static` and hands back shared `Rc<T>` handles.
//! The host decides how an object is exposed under a capability (Rust has no
//! runtime trait casting), see
//! [`InMemoryScene::expose`](crate::adapters::InMemoryScene::expose).

use crate::domain::{NodeId, ReceiverKey};
use std::rc::Rc;

/// Entity-tree query (Driven Port).
///
/// An unknown node resolves to no receivers.
pub trait ComponentLocator {
    /// Receivers of `T` attached directly to `node`, in attachment order.
    fn attached<T: ?Sized + 'static>(&self, node: NodeId) -> Vec<Rc<T>>;

    /// Receivers of `T` in the subtree rooted at `node`, pre-order.
    ///
    /// With `include_inactive_nodes == false`, nodes that are inactive in the
    /// hierarchy contribute nothing.
    fn attached_in_subtree<T: ?Sized + 'static>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
    ) -> Vec<Rc<T>>;

    /// Receivers of `T` on `node`, then on its parent, and so on up to the root.
    fn attached_along_ancestors<T: ?Sized + 'static>(&self, node: NodeId) -> Vec<Rc<T>> {
        let mut found = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            found.extend(self.attached::<T>(id));
            current = self.parent(id);
        }
        found
    }

    fn parent(&self, node: NodeId) -> Option<NodeId>;
}

/// Liveness query (Driven Port).
pub trait LivenessFilter {
    /// `false` only if the receiver is liveness-aware and currently disabled
    /// or inactive. Receivers the host knows nothing about are eligible.
    fn is_eligible(&self, receiver: ReceiverKey) -> bool;
}

/// Destroyed-object query (Driven Port).
///
/// Used by global registries to self-heal stale entries.
pub trait DestroyedQuery {
    /// Whether the receiver's host object has been torn down.
    fn is_destroyed(&self, receiver: ReceiverKey) -> bool;
}

/// World-scan query (Driven Port).
///
/// Deliberately unindexed on the core side: a scan is expected to cost
/// O(all live objects).
pub trait WorldScan {
    /// Every live (not destroyed) object exposed under `T`, enabled or not.
    fn find_all<T: ?Sized + 'static>(&self) -> Vec<Rc<T>>;
}

/// Every port a full [`Messenger`](crate::service::Messenger) needs.
pub trait SceneQuery: ComponentLocator + LivenessFilter + DestroyedQuery + WorldScan {}

impl<S> SceneQuery for S where S: ComponentLocator + LivenessFilter + DestroyedQuery + WorldScan {}
