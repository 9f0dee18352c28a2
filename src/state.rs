//! Shared application state for request handlers.

use std::sync::Arc;

use crate::cluster::DeploymentStore;
use crate::config::AppConfig;
use crate::restart::Restarter;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds only immutable data: the validated configuration and the restarter,
/// whose store is safe for concurrent use.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub restarter: Restarter,
}

impl AppState {
    /// Creates the application state from a validated configuration and a
    /// Deployment store.
    pub fn new(config: AppConfig, store: Arc<dyn DeploymentStore>) -> Self {
        Self {
            config: Arc::new(config),
            restarter: Restarter::new(store),
        }
    }

    /// The bearer token callers must present.
    pub fn token(&self) -> &str {
        self.config.token()
    }
}
