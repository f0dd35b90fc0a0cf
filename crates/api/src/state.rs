use std::sync::Arc;

use crate::config::ServerConfig;
use crate::store::CareRecordStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<CareRecordStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store = CareRecordStore::new(config.data_dir.clone());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}
