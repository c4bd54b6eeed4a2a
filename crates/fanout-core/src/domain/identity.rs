//! Receiver identity and entity node handles.
//!
//! Receivers are compared by reference, never by value: two receivers are the
//! same receiver iff they live in the same shared allocation.

use std::fmt;
use std::rc::Rc;

/// Reference identity of a receiver.
///
/// The key is the address of the receiver's allocation, so it can be derived
/// both from an `Rc<dyn Capability>` held by a broadcaster and from `&self`
/// inside one of the receiver's own methods. This is what lets a handler
/// unregister itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverKey(usize);

impl ReceiverKey {
    /// Key of the object behind `receiver`.
    #[must_use]
    pub fn of<T: ?Sized>(receiver: &T) -> Self {
        Self(receiver as *const T as *const () as usize)
    }

    /// Key of the object an `Rc` points at.
    #[must_use]
    pub fn of_rc<T: ?Sized>(receiver: &Rc<T>) -> Self {
        Self(Rc::as_ptr(receiver) as *const () as usize)
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for ReceiverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handle of an externally owned entity node.
///
/// A handle that does not resolve to a node in the tree behaves like a null
/// node: every query against it yields no receivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Human-readable name of a capability type, used in logs and errors.
#[must_use]
pub fn capability_name<T: ?Sized>() -> &'static str {
    std::any::type_name::<T>()
}
