//! Outcome of one registry dispatch.

/// Counts collected while a registry dispatch iterates its subscribers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed without error.
    pub delivered: usize,
    /// Handlers that returned an error (isolated, logged).
    pub failed: usize,
    /// Destroyed receivers skipped and scheduled for removal.
    pub pruned: usize,
}

impl DispatchReport {
    /// Receivers whose handler actually ran, successfully or not.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }

    /// True when every visited receiver was delivered to.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.pruned == 0
    }
}
