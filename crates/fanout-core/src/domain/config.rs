//! Dispatch configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use fanout_core::DispatchConfig;
//!
//! let config = DispatchConfig::default()
//!     .with_scan_warning_threshold(64)
//!     .with_trace_deliveries(true);
//! config.validate()?;
//! ```

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::env;

/// Tuning knobs shared by every dispatch path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Find-and-broadcast logs a warning when its candidate set is larger
    /// than this. Must be non-zero.
    pub scan_warning_threshold: usize,
    /// Emit a `trace` event for every single delivery.
    pub trace_deliveries: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scan_warning_threshold: Self::DEFAULT_SCAN_WARNING_THRESHOLD,
            trace_deliveries: false,
        }
    }
}

impl DispatchConfig {
    pub const DEFAULT_SCAN_WARNING_THRESHOLD: usize = 256;

    /// Create configuration from environment variables.
    ///
    /// - `FANOUT_SCAN_WARNING_THRESHOLD` (default: 256)
    /// - `FANOUT_TRACE_DELIVERIES` (default: false)
    ///
    /// Unparseable values fall back to the defaults, as does a zero
    /// threshold, so the result always passes [`validate`](Self::validate).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scan_warning_threshold: env::var("FANOUT_SCAN_WARNING_THRESHOLD")
                .ok()
                .and_then(|v| parse_threshold(&v))
                .unwrap_or(defaults.scan_warning_threshold),
            trace_deliveries: env::var("FANOUT_TRACE_DELIVERIES")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(defaults.trace_deliveries),
        }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.scan_warning_threshold == 0 {
            return Err(DispatchError::InvalidConfig(
                "scan_warning_threshold cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style method to set the scan warning threshold
    pub fn with_scan_warning_threshold(mut self, threshold: usize) -> Self {
        self.scan_warning_threshold = threshold;
        self
    }

    /// Builder-style method to toggle per-delivery tracing
    pub fn with_trace_deliveries(mut self, enabled: bool) -> Self {
        self.trace_deliveries = enabled;
        self
    }
}

/// A positive threshold, or `None` for anything `validate` would reject.
fn parse_threshold(raw: &str) -> Option<usize> {
    raw.trim().parse().ok().filter(|threshold| *threshold > 0)
}
