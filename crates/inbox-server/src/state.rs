use inbox_core::config::AppConfig;
use inbox_core::error::InboxError;
use inbox_core::store::InteractionStore;
use std::sync::Arc;

/// Shared application state for the server.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// `None` when no database is configured; every data route then answers 500.
    pub store: Option<Arc<dyn InteractionStore>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Option<Arc<dyn InteractionStore>>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> Result<&dyn InteractionStore, InboxError> {
        self.store
            .as_deref()
            .ok_or(InboxError::DatabaseUnconfigured)
    }
}
