//! Local Dispatcher
//!
//! Synchronous fan-out to the receivers reachable from one entity node:
//! directly attached, the whole subtree, or the ancestor chain.
//!
//! There is no failure isolation here. The caller owns a bounded,
//! caller-selected receiver set and has the local context to handle an error,
//! so the first failing receiver aborts the call.

use crate::domain::{capability_name, DispatchConfig, NodeId, ReceiverKey};
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::ports::{ComponentLocator, LivenessFilter};
use std::rc::Rc;
use tracing::{debug, trace};

/// Entity-scoped dispatcher over a scene implementing the locator and
/// liveness ports.
pub struct LocalDispatcher<S> {
    scene: Rc<S>,
    metrics: Rc<DispatchMetrics>,
    trace_deliveries: bool,
}

impl<S> LocalDispatcher<S>
where
    S: ComponentLocator + LivenessFilter,
{
    /// Create a dispatcher with its own metrics and default configuration
    pub fn new(scene: Rc<S>) -> Self {
        Self::with_metrics(scene, Rc::new(DispatchMetrics::new()), &DispatchConfig::default())
    }

    /// Create a dispatcher recording into shared metrics
    pub fn with_metrics(scene: Rc<S>, metrics: Rc<DispatchMetrics>, config: &DispatchConfig) -> Self {
        Self {
            scene,
            metrics,
            trace_deliveries: config.trace_deliveries,
        }
    }

    pub fn scene(&self) -> &Rc<S> {
        &self.scene
    }

    /// Invoke `functor` once per eligible receiver attached directly to `node`.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Receiver`] from the first failing receiver; later
    /// receivers are not invoked.
    pub fn execute<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let receivers = self.scene.attached::<T>(node);
        let delivered = self.fan_out(&receivers, include_disabled, &mut functor)?;
        self.finish::<T>("execute", node, delivered);
        Ok(delivered)
    }

    pub fn execute_with_arg<T, A, F>(
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

    /// Pre-order fan-out over the subtree rooted at `node`.
    pub fn broadcast<T, F>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let receivers = self
            .scene
            .attached_in_subtree::<T>(node, include_inactive_nodes);
        let delivered = self.fan_out(&receivers, include_disabled, &mut functor)?;
        self.finish::<T>("broadcast", node, delivered);
        Ok(delivered)
    }

    pub fn broadcast_with_arg<T, A, F>(
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

    /// `execute` at `node`, then at its parent, and so on up to the root.
    ///
    /// Each ancestor is resolved after the previous level has been delivered.
    pub fn execute_upwards<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let mut delivered = 0;
        let mut current = Some(node);
        while let Some(id) = current {
            let receivers = self.scene.attached::<T>(id);
            delivered += self.fan_out(&receivers, include_disabled, &mut functor)?;
            current = self.scene.parent(id);
        }
        self.finish::<T>("execute_upwards", node, delivered);
        Ok(delivered)
    }

    pub fn execute_upwards_with_arg<T, A, F>(
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

    /// Liveness filtering as applied at delivery time, for token capture.
    pub(crate) fn eligible<T: ?Sized>(&self, receivers: Vec<Rc<T>>, include_disabled: bool) -> Vec<Rc<T>> {
        if include_disabled {
            return receivers;
        }
        receivers
            .into_iter()
            .filter(|receiver| self.scene.is_eligible(ReceiverKey::of_rc(receiver)))
            .collect()
    }

    /// Deliver to an already resolved receiver list.
    ///
    /// Liveness is checked per receiver right before its turn, so a handler
    /// that disables a later receiver prevents its delivery.
    pub(crate) fn fan_out<T, F>(
        &self,
        receivers: &[Rc<T>],
        include_disabled: bool,
        functor: &mut F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let mut delivered = 0;
        for receiver in receivers {
            let key = ReceiverKey::of_rc(receiver);
            if !include_disabled && !self.scene.is_eligible(key) {
                continue;
            }
            functor(receiver.as_ref()).map_err(DispatchError::receiver::<T>)?;
            if self.trace_deliveries {
                trace!(capability = capability_name::<T>(), receiver = %key, "Delivered");
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    pub(crate) fn metrics(&self) -> &Rc<DispatchMetrics> {
        &self.metrics
    }

    fn finish<T: ?Sized>(&self, operation: &'static str, node: NodeId, delivered: usize) {
        self.metrics.record_local(delivered);
        debug!(
            capability = capability_name::<T>(),
            operation,
            node = %node,
            delivered,
            "Local dispatch complete"
        );
    }
}
