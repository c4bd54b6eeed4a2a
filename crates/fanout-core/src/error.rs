//! Error types for the dispatch core

use crate::domain::{capability_name, NodeId, ReceiverKey};
use thiserror::Error;

/// Errors surfaced to callers of the dispatch core.
///
/// Failures of individual receivers during a registry dispatch are isolated
/// and never appear here; they are logged and counted in
/// [`DispatchReport::failed`](crate::domain::DispatchReport::failed).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A receiver was passed where a live one is required, but its host
    /// object has already been destroyed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `execute` was called on a registry that is already dispatching for the
    /// same capability. Not retried.
    #[error("Re-entrant dispatch on registry for `{capability}`")]
    ReentrantDispatch { capability: &'static str },

    /// A receiver failed during local, token or find-and-broadcast delivery.
    /// Remaining deliveries of that call were aborted.
    #[error("Receiver of `{capability}` failed: {source}")]
    Receiver {
        capability: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DispatchError {
    pub(crate) fn reentrant<T: ?Sized>() -> Self {
        Self::ReentrantDispatch {
            capability: capability_name::<T>(),
        }
    }

    pub(crate) fn receiver<T: ?Sized>(source: anyhow::Error) -> Self {
        Self::Receiver {
            capability: capability_name::<T>(),
            source,
        }
    }

    /// True for the fatal re-entrancy precondition failure.
    #[must_use]
    pub fn is_reentrant(&self) -> bool {
        matches!(self, Self::ReentrantDispatch { .. })
    }
}

/// Errors from the in-memory scene adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Receiver not found: {0}")]
    ReceiverNotFound(ReceiverKey),

    #[error("Receiver {0} has been destroyed")]
    ReceiverDestroyed(ReceiverKey),

    /// The `Rc` handed to `expose` does not point at the attached component.
    #[error("Capability handle {actual} does not belong to receiver {expected}")]
    KeyMismatch {
        expected: ReceiverKey,
        actual: ReceiverKey,
    },

    #[error("Re-parenting {node} under {parent} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },
}
