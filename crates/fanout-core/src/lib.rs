//! # Fanout Core
//!
//! Typed, synchronous message dispatch to receivers that implement a
//! capability trait.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure dispatch logic, no logging
//!   - `SubscriberSet`: Main set plus staging sets, merged by a drop guard
//!   - `DispatchState`: `Idle` / `Dispatching` / `Draining`
//!   - `Token`: Immutable captured receiver snapshot
//!   - `DispatchConfig`: Configuration with validation
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `MessagingApi`: Driving port (inbound API)
//!   - `ComponentLocator`, `LivenessFilter`, `DestroyedQuery`, `WorldScan`:
//!     Driven ports (dependencies on the host scene)
//!
//! - **Service Layer** (`service/`): Delivery topologies
//!   - `LocalDispatcher`: Node, subtree and ancestor-chain delivery
//!   - `Registry` / `RegistryHub`: Global per-capability subscriber lists
//!   - `Messenger`: Implements `MessagingApi`
//!
//! - **Adapters Layer** (`adapters/`): `InMemoryScene`
//!
//! ## Failure Semantics
//!
//! - Local, token and find-and-broadcast delivery abort on the first failing
//!   receiver and return `DispatchError::Receiver`.
//! - Registry delivery isolates failures: each one is logged, counted in the
//!   `DispatchReport`, and delivery continues.
//! - Re-entrant registry dispatch for the same capability is rejected with
//!   `DispatchError::ReentrantDispatch`.
//!
//! ## Threading
//!
//! Everything here is single-threaded (`Rc`, `RefCell`) and `!Send`. The
//! hazards handled are re-entrancy and mutation during iteration.
//!
//! ## Usage Example
//!
//! ```ignore
//! use fanout_core::{InMemoryScene, Messenger, MessagingApi};
//! use std::rc::Rc;
//!
//! trait OnDamage {
//!     fn on_damage(&self, amount: u32);
//! }
//!
//! let scene = Rc::new(InMemoryScene::new());
//! let player = scene.spawn("player", None)?;
//! let health = Rc::new(Health::default());
//! let key = scene.attach(player, health.clone())?;
//! scene.expose::<dyn OnDamage>(key, health)?;
//!
//! let messenger = Messenger::new(scene);
//! messenger.execute_with_arg::<dyn OnDamage, u32, _>(player, &10, false, |r, amount| {
//!     r.on_damage(*amount);
//!     Ok(())
//! })?;
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::InMemoryScene;
pub use domain::{
    capability_name, DispatchConfig, DispatchReport, DispatchState, NodeId, ReceiverKey,
    SubscriberSet, Token,
};
pub use error::{DispatchError, SceneError};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use ports::{
    ComponentLocator, DestroyedQuery, LivenessFilter, MessagingApi, SceneQuery, WorldScan,
};
pub use service::{LocalDispatcher, Messenger, Registry, RegistryHub};
