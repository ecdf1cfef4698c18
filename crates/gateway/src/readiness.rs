//! Readiness tracking for the inference endpoint

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the last probe or inference call found the endpoint warm.
///
/// Owned by a gateway instance, so independent gateways never share state.
#[derive(Debug, Default)]
pub struct ReadinessCell {
    loaded: AtomicBool,
}

impl ReadinessCell {
    /// Create a cell in the not-ready state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.loaded.store(true, Ordering::Release);
    }

    pub(crate) fn mark_loading(&self) {
        self.loaded.store(false, Ordering::Release);
    }
}
