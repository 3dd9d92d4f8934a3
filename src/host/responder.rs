//! Single-shot response completion
//!
//! A `Responder` completes exactly once: `complete` consumes it, and a
//! responder dropped unanswered (early return, panic unwinding through the
//! request task) sends a 500 so no request is left hanging.

use tokio::sync::oneshot;

use crate::http::{self, StreamResponse};
use crate::logger;

#[derive(Debug)]
pub struct Responder {
    tx: Option<oneshot::Sender<StreamResponse>>,
    url: String,
}

impl Responder {
    /// Create a responder and the receiver its response arrives on
    pub fn channel(url: impl Into<String>) -> (Self, oneshot::Receiver<StreamResponse>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            tx: Some(tx),
            url: url.into(),
        };
        (responder, rx)
    }

    /// URL of the request this responder answers
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver the response
    pub fn complete(mut self, response: StreamResponse) {
        if let Some(tx) = self.tx.take() {
            if tx.send(response).is_err() {
                // Dropping the response here releases its read handle
                logger::log_debug(&format!("Consumer went away before response: {}", self.url));
            }
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            logger::log_error(&format!(
                "Request dropped without a response, answering 500: {}",
                self.url
            ));
            let _ = tx.send(http::build_500_response());
        }
    }
}
