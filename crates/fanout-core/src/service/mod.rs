//! Service Layer - Delivery topologies
//!
//! - [`LocalDispatcher`]: entity-scoped delivery (node, subtree, ancestors)
//! - [`Registry`]: per-capability global subscriber list with staged mutation
//! - [`RegistryHub`]: owner of every registry
//! - [`Messenger`]: implements `MessagingApi` over all of the above

pub mod dispatcher;
pub mod hub;
pub mod messenger;
pub mod registry;

pub use dispatcher::LocalDispatcher;
pub use hub::RegistryHub;
pub use messenger::Messenger;
pub use registry::Registry;
