//! Scheme registration
//!
//! The registrar is consumed by registration, so a handler is installed at
//! most once per registrar, and only after the host signals readiness.

use std::sync::Arc;

use super::fs::FilesystemAccess;
use super::handler::SchemeHandler;
use super::stream::StreamSettings;
use crate::config::SchemeConfig;
use crate::host::{HostRuntime, RegistrationError};

pub struct SchemeRegistrar {
    handler: SchemeHandler,
}

impl SchemeRegistrar {
    pub const fn new(handler: SchemeHandler) -> Self {
        Self { handler }
    }

    /// Registrar for a local-disk handler configured from `[scheme]`
    pub fn from_config(config: &SchemeConfig) -> Self {
        Self::new(SchemeHandler::local(StreamSettings::from_config(config)))
    }

    /// Registrar for a handler over a custom filesystem
    pub fn with_filesystem(fs: Arc<dyn FilesystemAccess>, settings: StreamSettings) -> Self {
        Self::new(SchemeHandler::new(fs, settings))
    }

    pub fn scheme(&self) -> &str {
        &self.handler.settings().scheme
    }

    /// Wait for the host's ready signal, then register the handler
    pub async fn register_when_ready(self, host: &HostRuntime) -> Result<(), RegistrationError> {
        host.when_ready().await;
        let scheme = self.scheme().to_string();
        host.register_protocol(&scheme, Arc::new(self.handler))
    }
}
