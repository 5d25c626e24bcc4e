//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;

/// State shared by every request handler.
///
/// Calls share nothing but the configuration; each media stream owns its
/// bridge and both connections.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
