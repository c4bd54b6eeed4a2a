//! Adapters Layer (Driven Adapters)
//!
//! Implementations of the driven ports.
//!
//! ## Adapters
//!
//! - `InMemoryScene` - Entity tree with attachable components; implements
//!   `ComponentLocator`, `LivenessFilter`, `DestroyedQuery` and `WorldScan`

pub mod scene;

pub use scene::InMemoryScene;
