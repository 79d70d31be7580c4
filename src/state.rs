//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! wraps the one `ChatStore` built at startup; cloning the state clones a
//! handle, never the chat data.

use crate::config::StoreConfig;
use crate::services::store::ChatStore;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: ChatStore,
}

impl AppState {
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { store: ChatStore::new(config) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
