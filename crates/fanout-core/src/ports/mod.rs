//! Ports Layer
//!
//! Defines the interfaces (traits) for:
//! - Driving Ports (inbound) - API for callers
//! - Driven Ports (outbound) - Dependencies on the host environment

pub mod inbound;
pub mod outbound;

pub use inbound::MessagingApi;
pub use outbound::{ComponentLocator, DestroyedQuery, LivenessFilter, SceneQuery, WorldScan};
