use std::sync::Arc;

use hashbin_common::StorageEngine;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub engine: StorageEngine,
    pub config: Arc<AppConfig>,
}
