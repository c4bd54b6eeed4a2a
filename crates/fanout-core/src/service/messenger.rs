//! Messenger Service
//!
//! Implements the `MessagingApi` port over an injected scene and a
//! [`RegistryHub`]. Entity-scoped calls go to the [`LocalDispatcher`],
//! registry calls to the hub; find-and-broadcast and the token factories
//! combine both.

use super::dispatcher::LocalDispatcher;
use super::hub::RegistryHub;
use crate::domain::{capability_name, DispatchConfig, DispatchReport, NodeId, ReceiverKey, Token};
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::ports::{ComponentLocator, DestroyedQuery, MessagingApi, SceneQuery, WorldScan};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::{debug, warn};

/// Messaging service
///
/// Single entry point to every delivery topology.
pub struct Messenger<S> {
    dispatcher: LocalDispatcher<S>,
    hub: Rc<RegistryHub>,
    config: DispatchConfig,
}

impl<S: SceneQuery + 'static> Messenger<S> {
    /// Create a messenger with default configuration and a fresh hub
    pub fn new(scene: Rc<S>) -> Self {
        Self::build(scene, DispatchConfig::default())
    }

    /// Create with a validated custom configuration
    pub fn with_config(scene: Rc<S>, config: DispatchConfig) -> Result<Self, DispatchError> {
        config.validate()?;
        Ok(Self::build(scene, config))
    }

    /// Create over an existing hub, sharing its registries and metrics
    pub fn with_hub(scene: Rc<S>, hub: Rc<RegistryHub>) -> Self {
        let config = hub.config().clone();
        let dispatcher = LocalDispatcher::with_metrics(scene, hub.metrics().clone(), &config);
        Self {
            dispatcher,
            hub,
            config,
        }
    }

    fn build(scene: Rc<S>, config: DispatchConfig) -> Self {
        let metrics = Rc::new(DispatchMetrics::new());
        let hub = Rc::new(RegistryHub::with_metrics(
            scene.clone(),
            config.clone(),
            metrics.clone(),
        ));
        let dispatcher = LocalDispatcher::with_metrics(scene, metrics, &config);
        Self {
            dispatcher,
            hub,
            config,
        }
    }

    pub fn scene(&self) -> &Rc<S> {
        self.dispatcher.scene()
    }

    pub fn hub(&self) -> &Rc<RegistryHub> {
        &self.hub
    }

    pub fn dispatcher(&self) -> &LocalDispatcher<S> {
        &self.dispatcher
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// World scan unioned with the registry snapshot, by reference identity.
    ///
    /// Scan results come first in scan order, then registry-only receivers in
    /// registration order. Destroyed receivers are dropped.
    fn find_candidates<T: ?Sized + 'static>(&self) -> Vec<Rc<T>> {
        let scene = self.scene();
        let mut candidates: IndexMap<ReceiverKey, Rc<T>> = IndexMap::new();
        let scanned = scene.find_all::<T>();
        let registered = self.hub.copy_receivers::<T>();
        let scanned_count = scanned.len();

        for receiver in scanned.into_iter().chain(registered) {
            let key = ReceiverKey::of_rc(&receiver);
            if scene.is_destroyed(key) {
                continue;
            }
            candidates.entry(key).or_insert(receiver);
        }

        self.dispatcher.metrics().record_scan();
        let capability = capability_name::<T>();
        debug!(
            capability,
            scanned = scanned_count,
            candidates = candidates.len(),
            "World scan for find-and-broadcast"
        );
        if candidates.len() > self.config.scan_warning_threshold {
            warn!(
                capability,
                candidates = candidates.len(),
                threshold = self.config.scan_warning_threshold,
                "Find-and-broadcast over a large object set; prefer registry broadcast for frequent messages"
            );
        }

        candidates.into_values().collect()
    }
}

impl<S: SceneQuery + 'static> MessagingApi for Messenger<S> {
    fn execute<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        self.dispatcher
            .execute::<T, F>(node, include_disabled, functor)
    }

    fn broadcast<T, F>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        self.dispatcher
            .broadcast::<T, F>(node, include_inactive_nodes, include_disabled, functor)
    }

    fn execute_upwards<T, F>(
        &self,
        node: NodeId,
        include_disabled: bool,
        functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        self.dispatcher
            .execute_upwards::<T, F>(node, include_disabled, functor)
    }

    fn register_global<T>(&self, receiver: Rc<T>) -> Result<bool, DispatchError>
    where
        T: ?Sized + 'static,
    {
        self.hub.register_global::<T>(receiver)
    }

    fn unregister_global<T>(&self, receiver: ReceiverKey) -> bool
    where
        T: ?Sized + 'static,
    {
        self.hub.unregister_global::<T>(receiver)
    }

    fn broadcast_global<T, F>(&self, functor: F) -> Result<DispatchReport, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        self.hub.broadcast::<T, F>(functor)
    }

    fn find_and_broadcast<T, F>(
        &self,
        include_disabled: bool,
        mut functor: F,
    ) -> Result<usize, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        let candidates = self.find_candidates::<T>();
        let delivered = self
            .dispatcher
            .fan_out(&candidates, include_disabled, &mut functor)?;
        self.dispatcher.metrics().record_local(delivered);
        debug!(
            capability = capability_name::<T>(),
            delivered,
            "Find-and-broadcast complete"
        );
        Ok(delivered)
    }

    fn create_execute_token<T>(&self, node: NodeId, include_disabled: bool) -> Option<Token<T>>
    where
        T: ?Sized + 'static,
    {
        let receivers = self.scene().attached::<T>(node);
        Token::capture(self.dispatcher.eligible(receivers, include_disabled))
    }

    fn create_broadcast_token<T>(
        &self,
        node: NodeId,
        include_inactive_nodes: bool,
        include_disabled: bool,
    ) -> Option<Token<T>>
    where
        T: ?Sized + 'static,
    {
        let receivers = self
            .scene()
            .attached_in_subtree::<T>(node, include_inactive_nodes);
        Token::capture(self.dispatcher.eligible(receivers, include_disabled))
    }

    fn create_execute_upwards_token<T>(
        &self,
        node: NodeId,
        include_disabled: bool,
    ) -> Option<Token<T>>
    where
        T: ?Sized + 'static,
    {
        let receivers = self.scene().attached_along_ancestors::<T>(node);
        Token::capture(self.dispatcher.eligible(receivers, include_disabled))
    }

    fn create_global_token<T>(&self) -> Option<Token<T>>
    where
        T: ?Sized + 'static,
    {
        let scene = self.scene();
        let receivers = self
            .hub
            .copy_receivers::<T>()
            .into_iter()
            .filter(|receiver| !scene.is_destroyed(ReceiverKey::of_rc(receiver)))
            .collect();
        Token::capture(receivers)
    }

    fn create_find_and_broadcast_token<T>(&self, include_disabled: bool) -> Option<Token<T>>
    where
        T: ?Sized + 'static,
    {
        let candidates = self.find_candidates::<T>();
        Token::capture(self.dispatcher.eligible(candidates, include_disabled))
    }
}
