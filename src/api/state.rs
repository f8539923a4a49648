use std::sync::Arc;

use crate::services::providers::MovieProvider;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MovieProvider>,
}

impl AppState {
    pub fn new(provider: Arc<dyn MovieProvider>) -> Self {
        Self { provider }
    }
}
