//! Application state for the calculation API.

use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::store::{InMemoryResultStore, ResultStore};

/// Shared application state.
///
/// Holds the loaded rate tables and the store finished results are written to.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
    results: Arc<dyn ResultStore>,
}

impl AppState {
    /// Creates state with an in-memory result store.
    pub fn new(config: ConfigLoader) -> Self {
        Self::with_store(config, Arc::new(InMemoryResultStore::new()))
    }

    /// Creates state with the given result store.
    pub fn with_store(config: ConfigLoader, results: Arc<dyn ResultStore>) -> Self {
        Self {
            config: Arc::new(config),
            results,
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }

    /// Returns the result store.
    pub fn results(&self) -> &dyn ResultStore {
        self.results.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_state_shares_store_between_clones() {
        let config = ConfigLoader::load("./config/us").expect("Failed to load config");
        let state = AppState::new(config);
        let clone = state.clone();
        assert!(clone.results().is_empty());
        assert_eq!(state.config().tax_years(), clone.config().tax_years());
    }
}
