//! Domain Layer - Pure dispatch logic
//!
//! This layer contains:
//! - Receiver identity and node handles
//! - The registry dispatch state machine
//! - The staged subscriber set
//! - Receiver tokens
//! - Dispatch reports and configuration
//!
//! RULES:
//! - No knowledge of the entity tree or object lifecycle
//! - No logging

pub mod config;
pub mod identity;
pub mod report;
pub mod state;
pub mod subscribers;
pub mod token;

pub use config::DispatchConfig;
pub use identity::{capability_name, NodeId, ReceiverKey};
pub use report::DispatchReport;
pub use state::DispatchState;
pub use subscribers::{DispatchPass, SubscriberSet};
pub use token::Token;
