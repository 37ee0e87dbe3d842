//! Shared application state for all routes.

use crate::service::DataManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<dyn DataManager>,
}

impl AppState {
    pub fn new(manager: Arc<dyn DataManager>) -> Self {
        AppState { manager }
    }
}
