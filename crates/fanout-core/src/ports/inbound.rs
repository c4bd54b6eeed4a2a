//! Inbound Ports (Driving Ports)
//!
//! The public messaging surface. Implemented by
//! [`Messenger`](crate::service::Messenger).
//!
//! Failure semantics differ by topology:
//! - entity-scoped delivery, find-and-broadcast and tokens propagate the first
//!   receiver error and abort the rest of that call;
//! - registry delivery isolates receiver errors, logs them and keeps going.

use crate::domain::{DispatchReport, NodeId, ReceiverKey, Token};
use crate::error::DispatchError;
use std::rc::Rc;

/// Messaging API (Driving Port)
pub trait MessagingApi {
    /// Invoke `functor` once per eligible receiver of `T` attached directly to
    /// `node`, in attachment order. Returns the number of deliveries.
    fn execute<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>;

    /// Pre-order fan-out over the subtree rooted at `node`.
    fn broadcast<T, F>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>;

    /// `execute` at `node`, then at each ancestor up to and including the root.
    fn execute_upwards<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>;

    /// Opt a receiver into hierarchy-independent delivery.
    fn register_global<T>(&self, receiver: Rc<T>) -> Result<bool, DispatchError>
    where
        T: ?Sized + 'static;

    fn unregister_global<T>(&self, receiver: ReceiverKey) -> bool
    where
        T: ?Sized + 'static;

    /// Deliver to every receiver registered for `T`, with failure isolation.
    fn broadcast_global<T, F>(&self, functor: F) -> Result<DispatchReport, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>;

    /// Deliver to every live object implementing `T`, registered or not.
    ///
    /// Cold path: costs a full world scan. Prefer [`broadcast_global`]
    /// for frequent messages.
    ///
    /// [`broadcast_global`]: MessagingApi::broadcast_global
    fn find_and_broadcast<T, F>(
        &self,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>;

    fn create_execute_token<T>(&self, node: NodeId, include_disabled: bool) -> Option<Token<T>>
    where
        T: ?Sized + 'static;

    fn create_broadcast_token<T>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
        include_disabled: bool,
    ) -> Option<Token<T>>
    where
        T: ?Sized + 'static;

    fn create_execute_upwards_token<T>(
        &self,
        node: NodeId,
        include_disabled: bool,
    ) -> Option<Token<T>>
    where
        T: ?Sized + 'static;

    /// Snapshot of the registry for `T`.
    fn create_global_token<T>(&self) -> Option<Token<T>>
    where
        T: ?Sized + 'static;

    fn create_find_and_broadcast_token<T>(&self, include_disabled: bool) -> Option<Token<T>>
    where
        T: ?Sized + 'static;

    fn execute_with_arg<T, A, F>(
        &self,
        node: NodeId,
        arg: &A,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.execute::<T, _>(node, include_disabled, |receiver| functor(receiver, arg))
    }

    fn broadcast_with_arg<T, A, F>(
        &self,
        node: NodeId,
        arg: &A,
        include_inactive_nodes: bool,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.broadcast::<T, _>(node, include_inactive_nodes, include_disabled, |receiver| {
            functor(receiver, arg)
        })
    }

    fn execute_upwards_with_arg<T, A, F>(
        &self,
        node: NodeId,
        arg: &A,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.execute_upwards::<T, _>(node, include_disabled, |receiver| functor(receiver, arg))
    }

    fn broadcast_global_with_arg<T, A, F>(
        &self,
        arg: &A,
        mut functor: F,
    ) -> Result<DispatchReport, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.broadcast_global::<T, _>(|receiver| functor(receiver, arg))
    }

    fn find_and_broadcast_with_arg<T, A, F>(
        &self,
        arg: &A,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.find_and_broadcast::<T, _>(include_disabled, |receiver| functor(receiver, arg))
    }
}
