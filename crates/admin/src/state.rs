//! Application state shared across handlers.

use std::sync::Arc;

use parfumerie_backend::BackendClient;

use crate::config::AdminConfig;

/// Application state shared across all handlers.
///
/// Holds the anonymous backend client; each request runs with the signed-in
/// staff member's token via `CurrentStaff::client`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: BackendClient,
}

impl AppState {
    #[must_use]
    pub fn new(config: AdminConfig) -> Self {
        let backend = BackendClient::new(&config.backend);
        Self::with_backend(config, backend)
    }

    /// Create state around an existing client.
    #[must_use]
    pub fn with_backend(config: AdminConfig, backend: BackendClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, backend }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get the anonymous backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }
}
