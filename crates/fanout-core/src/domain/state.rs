//! Dispatch state machine of a global registry.
//!
//! ```text
//! Idle ──execute──▶ Dispatching ──loop done / fault──▶ Draining ──merge──▶ Idle
//! ```

use std::fmt;

/// Governs whether registry mutation is applied immediately or staged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DispatchState {
    /// No dispatch in progress; mutations apply directly.
    #[default]
    Idle,
    /// A dispatch is iterating the main set; mutations are staged.
    Dispatching,
    /// Staged changes are being merged into the main set.
    Draining,
}

impl DispatchState {
    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Self::Idle
    }

    /// Whether mutations requested now must go through the staging sets.
    #[must_use]
    pub fn stages_mutations(self) -> bool {
        self == Self::Dispatching
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Dispatching => "dispatching",
            Self::Draining => "draining",
        };
        f.write_str(name)
    }
}
