//! Integration scenarios.

pub mod fixtures;

mod registry_flows;
mod scene_flows;
