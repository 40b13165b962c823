use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::PanelStore;

/// Shared application state: the store handle and immutable config
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PanelStore>,
    pub config: &'static AppConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn PanelStore>, config: &'static AppConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn PanelStore {
        self.store.as_ref()
    }
}
