//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::search::SearchCoordinator;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend client, the search coordinator and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    search: SearchCoordinator,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config)?;
        let search = SearchCoordinator::new(config.search_debounce);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                search,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the debounced search coordinator.
    #[must_use]
    pub fn search(&self) -> &SearchCoordinator {
        &self.inner.search
    }
}
