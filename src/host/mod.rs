//! Host runtime
//!
//! Stands in for the networking layer of a desktop shell: it raises a
//! one-time ready signal, keeps the custom-scheme protocol registry, and
//! dispatches each request to the registered handler together with a
//! single-shot [`Responder`].

mod responder;

pub use responder::Responder;

use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::{oneshot, watch};

use crate::http::{self, StreamResponse};
use crate::logger;

/// Request descriptor handed to a protocol handler
#[derive(Debug, Clone)]
pub struct SchemeRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
}

impl SchemeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// Handler for one custom scheme
///
/// `handle` is called on the dispatch path and must return promptly; the
/// responder may be completed synchronously or from spawned work, but
/// exactly once.
pub trait ProtocolHandler: Send + Sync {
    fn handle(&self, request: SchemeRequest, responder: Responder);
}

impl<F> ProtocolHandler for F
where
    F: Fn(SchemeRequest, Responder) + Send + Sync,
{
    fn handle(&self, request: SchemeRequest, responder: Responder) {
        self(request, responder);
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("host runtime is not ready, cannot register {scheme}://")]
    NotReady { scheme: String },
    #[error("a handler for {scheme}:// is already registered")]
    AlreadyRegistered { scheme: String },
    #[error("invalid scheme name '{scheme}'")]
    InvalidScheme { scheme: String },
}

pub struct HostRuntime {
    ready: watch::Sender<bool>,
    handlers: RwLock<HashMap<String, Arc<dyn ProtocolHandler>>>,
}

impl HostRuntime {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            ready,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Raise the ready signal. Returns false if it was already raised.
    pub fn signal_ready(&self) -> bool {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true))
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the ready signal has been raised
    pub async fn when_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Register the handler for `scheme`
    ///
    /// Only allowed once the runtime is ready, and only once per scheme
    /// until [`HostRuntime::unregister_protocol`] tears it down.
    pub fn register_protocol(
        &self,
        scheme: &str,
        handler: Arc<dyn ProtocolHandler>,
    ) -> Result<(), RegistrationError> {
        if !is_valid_scheme(scheme) {
            return Err(RegistrationError::InvalidScheme {
                scheme: scheme.to_string(),
            });
        }
        if !self.is_ready() {
            return Err(RegistrationError::NotReady {
                scheme: scheme.to_string(),
            });
        }

        let key = scheme.to_ascii_lowercase();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&key) {
            return Err(RegistrationError::AlreadyRegistered {
                scheme: scheme.to_string(),
            });
        }
        handlers.insert(key, handler);
        drop(handlers);

        logger::log_info(&format!("[Host] Registered {scheme}:// handler"));
        Ok(())
    }

    /// Remove the handler for `scheme`. Returns whether one was registered.
    pub fn unregister_protocol(&self, scheme: &str) -> bool {
        let removed = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&scheme.to_ascii_lowercase())
            .is_some();
        if removed {
            logger::log_info(&format!("[Host] Unregistered {scheme}:// handler"));
        }
        removed
    }

    pub fn is_protocol_registered(&self, scheme: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Hand `request` to the handler registered for its scheme
    ///
    /// Returns immediately; the response arrives on the receiver. Requests
    /// for schemes nobody handles are answered with 404.
    pub fn dispatch(&self, request: SchemeRequest) -> oneshot::Receiver<StreamResponse> {
        let (responder, rx) = Responder::channel(request.url.clone());

        let handler = request_scheme(&request.url).and_then(|scheme| {
            self.handlers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&scheme.to_ascii_lowercase())
                .cloned()
        });

        match handler {
            Some(handler) => handler.handle(request, responder),
            None => {
                logger::log_warning(&format!("No handler registered for {}", request.url));
                responder.complete(http::build_404_response());
            }
        }
        rx
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheme part of a URL, if it has one
fn request_scheme(url: &str) -> Option<&str> {
    url.split_once(':')
        .map(|(scheme, _)| scheme)
        .filter(|scheme| is_valid_scheme(scheme))
}

/// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
