//! Captured receiver snapshots for deferred or repeated delivery.

use crate::error::DispatchError;
use std::fmt;
use std::rc::Rc;

/// An immutable list of receivers captured at one point in time.
///
/// A token decouples "who receives" from "when it is delivered". It has no
/// link back to the scene or registry it was built from: receivers are not
/// re-checked for liveness on invoke, and later (un)registrations do not
/// affect it.
pub struct Token<T: ?Sized> {
    receivers: Box<[Rc<T>]>,
}

impl<T: ?Sized> Token<T> {
    /// Capture `receivers`. An empty capture yields no token.
    #[must_use]
    pub fn capture(receivers: Vec<Rc<T>>) -> Option<Self> {
        if receivers.is_empty() {
            return None;
        }
        Some(Self {
            receivers: receivers.into_boxed_slice(),
        })
    }

    /// Number of captured receivers. Never zero.
    #[must_use]
    pub fn count(&self) -> usize {
        self.receivers.len()
    }

    #[must_use]
    pub fn receivers(&self) -> &[Rc<T>] {
        &self.receivers
    }

    /// Call `functor` once per captured receiver, in capture order.
    ///
    /// # Errors
    ///
    /// The first failing receiver aborts the remaining invocations and its
    /// error is returned as [`DispatchError::Receiver`].
    pub fn invoke<F>(&self, mut functor: F) -> Result<usize, DispatchError>
    where
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        for receiver in self.receivers.iter() {
            functor(receiver.as_ref()).map_err(DispatchError::receiver::<T>)?;
        }
        Ok(self.receivers.len())
    }

    /// [`invoke`](Self::invoke) with an argument threaded to every call.
    pub fn invoke_with_arg<A, F>(&self, arg: &A, mut functor: F) -> Result<usize, DispatchError>
    where
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.invoke(|receiver| functor(receiver, arg))
    }
}

impl<T: ?Sized> Clone for Token<T> {
    fn clone(&self) -> Self {
        Self {
            receivers: self.receivers.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("count", &self.receivers.len())
            .finish()
    }
}
