// Application state module
// Shared by every connection task of the front end

use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;

use super::types::Config;
use crate::host::HostRuntime;

/// Application state
pub struct AppState {
    pub config: Config,
    pub host: Arc<HostRuntime>,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,

    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    pub fn new(config: &Config, host: Arc<HostRuntime>) -> Self {
        Self {
            config: config.clone(),
            host,
            cached_access_log: AtomicBool::new(config.logging.access_log),
            active_connections: AtomicUsize::new(0),
        }
    }
}
