//! # Registry Hub - Owner of Every Global Registry
//!
//! One [`Registry<T>`] per capability type, keyed by `TypeId`, created on
//! first use and living until [`RegistryHub::teardown`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let hub = RegistryHub::new(scene.clone());
//!
//! hub.register_global::<dyn OnSave>(saver.clone())?;
//! hub.broadcast::<dyn OnSave, _>(|r| r.on_save())?;
//!
//! // process shutdown
//! hub.teardown();
//! ```

use super::registry::Registry;
use crate::domain::{capability_name, DispatchConfig, DispatchReport, ReceiverKey};
use crate::error::DispatchError;
use crate::metrics::DispatchMetrics;
use crate::ports::DestroyedQuery;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Type-erased view of a `Registry<T>` for bookkeeping across capabilities.
trait ErasedRegistry {
    fn capability(&self) -> &'static str;
    fn subscriber_count(&self) -> usize;
    fn release(&self) -> Result<(), DispatchError>;
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: ?Sized + 'static> ErasedRegistry for Registry<T> {
    fn capability(&self) -> &'static str {
        capability_name::<T>()
    }

    fn subscriber_count(&self) -> usize {
        self.count()
    }

    fn release(&self) -> Result<(), DispatchError> {
        self.clear()
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Explicitly lifecycled owner of all global registries.
pub struct RegistryHub {
    registries: RefCell<HashMap<TypeId, Rc<dyn ErasedRegistry>>>,
    destroyed: Rc<dyn DestroyedQuery>,
    metrics: Rc<DispatchMetrics>,
    config: DispatchConfig,
}

impl RegistryHub {
    /// Create a hub whose registries consult `destroyed` to self-heal.
    pub fn new(destroyed: Rc<dyn DestroyedQuery>) -> Self {
        Self::with_config(destroyed, DispatchConfig::default())
    }

    pub fn with_config(destroyed: Rc<dyn DestroyedQuery>, config: DispatchConfig) -> Self {
        Self::with_metrics(destroyed, config, Rc::new(DispatchMetrics::new()))
    }

    pub(crate) fn with_metrics(
        destroyed: Rc<dyn DestroyedQuery>,
        config: DispatchConfig,
        metrics: Rc<DispatchMetrics>,
    ) -> Self {
        Self {
            registries: RefCell::new(HashMap::new()),
            destroyed,
            metrics,
            config,
        }
    }

    /// The registry for `T`, created on first use.
    pub fn registry<T: ?Sized + 'static>(&self) -> Rc<Registry<T>> {
        if let Some(existing) = self.existing::<T>() {
            return existing;
        }

        let created = Rc::new(Registry::<T>::new(
            self.destroyed.clone(),
            self.metrics.clone(),
            &self.config,
        ));
        self.registries
            .borrow_mut()
            .insert(TypeId::of::<T>(), created.clone());
        debug!(capability = capability_name::<T>(), "Registry created");
        created
    }

    /// The registry for `T`, if one has been created.
    pub fn existing<T: ?Sized + 'static>(&self) -> Option<Rc<Registry<T>>> {
        let erased = self.registries.borrow().get(&TypeId::of::<T>()).cloned()?;
        erased.into_any().downcast::<Registry<T>>().ok()
    }

    pub fn register_global<T: ?Sized + 'static>(&self, receiver: Rc<T>) -> Result<bool, DispatchError> {
        self.registry::<T>().register(receiver)
    }

    pub fn unregister_global<T: ?Sized + 'static>(&self, receiver: ReceiverKey) -> bool {
        self.existing::<T>()
            .is_some_and(|registry| registry.unregister(receiver))
    }

    /// Dispatch to every receiver registered for `T`.
    pub fn broadcast<T, F>(&self, functor: F) -> Result<DispatchReport, DispatchError>
    where
        T: ?Sized + 'static,
        F: FnMut(&T) -> anyhow::Result<()>,
    {
        match self.existing::<T>() {
            Some(registry) => registry.execute(functor),
            None => Ok(DispatchReport::default()),
        }
    }

    pub fn broadcast_with_arg<T, A, F>(
        &self,
        arg: &A,
        mut functor: F,
    ) -> Result<DispatchReport, DispatchError>
    where
        T: ?Sized + 'static,
        A: ?Sized,
        F: FnMut(&T, &A) -> anyhow::Result<()>,
    {
        self.broadcast::<T, _>(|receiver| functor(receiver, arg))
    }

    /// Subscribers currently registered for `T` (main set only).
    pub fn count<T: ?Sized + 'static>(&self) -> usize {
        self.existing::<T>().map_or(0, |registry| registry.count())
    }

    /// Snapshot of the registry for `T`; empty if none exists.
    pub fn copy_receivers<T: ?Sized + 'static>(&self) -> Vec<Rc<T>> {
        self.existing::<T>()
            .map(|registry| registry.copy_receivers())
            .unwrap_or_default()
    }

    /// Number of capability types with a registry.
    pub fn capability_count(&self) -> usize {
        self.registries.borrow().len()
    }

    /// Subscribers over every capability.
    pub fn total_subscribers(&self) -> usize {
        self.registries
            .borrow()
            .values()
            .map(|registry| registry.subscriber_count())
            .sum()
    }

    pub fn metrics(&self) -> &Rc<DispatchMetrics> {
        &self.metrics
    }

    pub fn destroyed_query(&self) -> &Rc<dyn DestroyedQuery> {
        &self.destroyed
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Process shutdown hook: releases every subscriber and forgets every
    /// registry.
    ///
    /// A registry that is mid-dispatch keeps its subscribers until the caller
    /// holding it finishes; it is still detached from the hub.
    pub fn teardown(&self) {
        let registries: Vec<_> = self.registries.borrow_mut().drain().collect();
        let mut released = 0;
        for (_, registry) in &registries {
            released += registry.subscriber_count();
            if let Err(err) = registry.release() {
                warn!(
                    capability = registry.capability(),
                    error = %err,
                    "Registry busy during teardown"
                );
            }
        }
        info!(
            registries = registries.len(),
            subscribers = released,
            "Registry hub torn down"
        );
    }
}
