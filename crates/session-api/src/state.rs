use std::sync::Arc;

use session_core::SessionManager;
use session_shared::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub manager: SessionManager,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(manager: SessionManager, config: AppConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }
}
