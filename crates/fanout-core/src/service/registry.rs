//! # Global Registry
//!
//! Process-wide, explicitly populated subscriber set for one capability type.
//!
//! ## Failure Isolation
//!
//! A registry serves many independent subscribers, so one failing handler must
//! not silence the rest: receiver errors are logged and counted, and delivery
//! continues. Contrast with the local dispatcher, which aborts.
//!
//! ## Self-Mutation
//!
//! Handlers routinely (un)register themselves or their peers ("notify once").
//! The main set is never mutated while dispatching; see
//! [`SubscriberSet`](crate::domain::SubscriberSet) for the staging protocol.
//!
//! ## Re-entrancy
//!
//! Dispatching `T` from inside a `T` handler is a fatal precondition failure
//! ([`DispatchError::ReentrantDispatch`]). Dispatching another capability `U`
//! from inside a `T` handler is fine.

use crate::domain::{
    capability_name, DispatchConfig, DispatchReport, DispatchState, ReceiverKey, SubscriberSet,
};
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::ports::DestroyedQuery;
use std::rc::Rc;
use tracing::{debug, error, trace, warn};

/// Subscriber registry for capability `T`.
///
/// Obtained from [`RegistryHub::registry`](super::RegistryHub::registry).
pub struct Registry<T: ?Sized> {
    subscribers: SubscriberSet<T>,
    destroyed: Rc<dyn DestroyedQuery>,
    metrics: Rc<DispatchMetrics>,
    trace_deliveries: bool,
}

impl<T: ?Sized + 'static> Registry<T> {
    pub(crate) fn new(
        destroyed: Rc<dyn DestroyedQuery>,
        metrics: Rc<DispatchMetrics>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            subscribers: SubscriberSet::new(),
            destroyed,
            metrics,
            trace_deliveries: config.trace_deliveries,
        }
    }

    /// Add `receiver`. Idempotent.
    ///
    /// While dispatching, the addition is staged and becomes visible once the
    /// current dispatch has drained.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidArgument`] if the receiver is already destroyed.
    pub fn register(&self, receiver: Rc<T>) -> Result<bool, DispatchError> {
        let key = ReceiverKey::of_rc(&receiver);
        if self.destroyed.is_destroyed(key) {
            return Err(DispatchError::InvalidArgument(format!(
                "cannot register destroyed receiver {key} for `{}`",
                capability_name::<T>()
            )));
        }
        let changed = self.subscribers.insert(receiver);
        if changed {
            debug!(
                capability = capability_name::<T>(),
                receiver = %key,
                state = %self.subscribers.state(),
                "Receiver registered"
            );
        }
        Ok(changed)
    }

    /// Remove the receiver identified by `key`. Staged while dispatching.
    pub fn unregister(&self, key: ReceiverKey) -> bool {
        let changed = self.subscribers.remove(key);
        if changed {
            debug!(
                capability = capability_name::<T>(),
                receiver = %key,
                state = %self.subscribers.state(),
                "Receiver unregistered"
            );
        }
        changed
    }

    /// Number of receivers in the main set. Staged changes are excluded.
    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn contains(&self, key: ReceiverKey) -> bool {
        self.subscribers.contains(key)
    }

    /// Snapshot of the main set, in registration order.
    pub fn copy_receivers(&self) -> Vec<Rc<T>> {
        self.subscribers.snapshot()
    }

    pub fn state(&self) -> DispatchState {
        self.subscribers.state()
    }

    /// Staged (additions, removals) awaiting the end of the current dispatch.
    pub fn pending_changes(&self) -> (usize, usize) {
        self.subscribers.pending()
    }

    /// Drop every subscriber.
    ///
    /// # Errors
    ///
    /// [`DispatchError::ReentrantDispatch`] while a dispatch is running.
    pub fn clear(&self) -> Result<(), DispatchError> {
        if self.subscribers.clear() {
            Ok(())
        } else {
            Err(DispatchError::reentrant::<T>())
        }
    }

    /// Invoke `functor` for every registered receiver.
    ///
    /// Destroyed receivers are skipped and scheduled for removal. Receiver
    /// errors are logged and do not stop delivery to the others. Staged
    /// (un)registrations are merged when the loop ends, including when a
    /// handler panics.
    ///
    /// # Errors
    ///
    /// [`DispatchError::ReentrantDispatch`] if this registry is already
    /// dispatching.
    pub fn execute<F>(&self, mut functor: F) -> Result<DispatchReport, DispatchError>
    where
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let capability = capability_name::<T>();
        let Some(pass) = self.subscribers.begin_dispatch() else {
            self.metrics.record_reentrancy_rejection();
            error!(capability, "Re-entrant global dispatch rejected");
            return Err(DispatchError::reentrant::<T>());
        };

        let mut report = DispatchReport::default();
        {
            let members = pass.members();
            for (key, receiver) in members.iter() {
                if self.destroyed.is_destroyed(*key) {
                    pass.schedule_removal(*key);
                    report.pruned += 1;
                    warn!(capability, receiver = %key, "Pruning destroyed receiver");
                    continue;
                }

                match functor(receiver.as_ref()) {
                    Ok(()) => {
                        report.delivered += 1;
                        if self.trace_deliveries {
                            trace!(capability, receiver = %key, "Delivered");
                        }
                    }
                    Err(err) => {
                        report.failed += 1;
                        error!(
                            capability,
                            receiver = %key,
                            error = %format!("{err:#}"),
                            "Receiver failed during global dispatch"
                        );
                    }
                }
            }
        }
        drop(pass);

        self.metrics.record_global(&report);
        debug!(
            capability,
            delivered = report.delivered,
            failed = report.failed,
            pruned = report.pruned,
            subscribers = self.subscribers.len(),
            "Global dispatch complete"
        );
        Ok(report)
    }

    /// [`execute`](Self::execute) with an argument threaded to every call.
    pub fn execute_with_arg<A, F>(
        &self,
        arg: &A,
        mut functor: F,
    ) -> Result<DispatchReport, DispatchError>
    where
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.execute(|receiver| functor(receiver, arg))
    }
}
