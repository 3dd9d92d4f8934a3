//! Per-request handler
//!
//! `handle` returns as soon as the request is queued; parsing, the stat
//! call, range resolution and opening the read handle run on a spawned task
//! that completes the responder exactly once. Requests share nothing but
//! the filesystem.

use futures::FutureExt;
use hyper::header::RANGE;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use super::error::StreamError;
use super::fs::{FilesystemAccess, LocalFilesystem};
use super::media::{self, VideoInfo};
use super::stream::{stream_content, StreamSettings};
use super::url::parse_scheme_url;
use crate::host::{ProtocolHandler, Responder, SchemeRequest};
use crate::http::{self, resolve_range, StreamResponse};
use crate::logger;

#[derive(Clone)]
pub struct SchemeHandler {
    fs: Arc<dyn FilesystemAccess>,
    settings: Arc<StreamSettings>,
}

impl SchemeHandler {
    pub fn new(fs: Arc<dyn FilesystemAccess>, settings: StreamSettings) -> Self {
        Self {
            fs,
            settings: Arc::new(settings),
        }
    }

    /// Handler over the local disk
    pub fn local(settings: StreamSettings) -> Self {
        Self::new(Arc::new(LocalFilesystem), settings)
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Check a video before playback: present, a regular file, non-empty
    pub async fn check_video(&self, path: &Path) -> Result<VideoInfo, StreamError> {
        let result = media::check_video(self.fs.as_ref(), path).await;
        match &result {
            Ok(info) => logger::log_debug(&format!(
                "[Video] {}: size={} modified={:?}",
                info.file_path.display(),
                info.file_size,
                info.modified
            )),
            Err(err) => log_check_failure(err),
        }
        result
    }

    /// Load a still image as a `data:` URL
    pub async fn image_data_url(&self, path: &Path) -> Result<String, StreamError> {
        let result = media::image_data_url(self.fs.as_ref(), path).await;
        if let Err(err) = &result {
            log_check_failure(err);
        }
        result
    }

    /// Produce the single response for `request`
    ///
    /// Never fails: every error, including a panic in the request path,
    /// becomes a status response.
    pub async fn respond(&self, request: &SchemeRequest) -> StreamResponse {
        match AssertUnwindSafe(self.try_respond(request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                log_failure(request, &err);
                err.into_response()
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                logger::log_error(&format!(
                    "Handler panicked for {}: {detail}; headers: {:?}",
                    request.url, request.headers
                ));
                http::build_500_response()
            }
        }
    }

    async fn try_respond(&self, request: &SchemeRequest) -> Result<StreamResponse, StreamError> {
        let path = parse_scheme_url(&request.url, &self.settings.scheme).map_err(|e| {
            logger::log_debug(&format!("Unusable URL {}: {e}", request.url));
            StreamError::NotFound {
                path: request.url.clone(),
            }
        })?;

        if logger::debug_enabled() {
            logger::log_debug(&format!(
                "[Scheme] {} {} -> {path}; headers: {:?}",
                request.method, request.url, request.headers
            ));
        }

        let target = self
            .fs
            .stat(Path::new(&path))
            .await
            .map_err(|source| StreamError::Internal {
                path: path.clone(),
                source,
            })?;

        if !target.exists {
            return Err(StreamError::NotFound { path });
        }
        if target.size == 0 {
            return Err(StreamError::EmptyFile { path });
        }

        // Unreadable header values count as absent
        let range_header = request
            .headers
            .get(RANGE)
            .and_then(|value| value.to_str().ok());
        let resolution = resolve_range(range_header, target.size);

        logger::log_debug(&format!(
            "[Scheme] {path}: size={} modified={:?} range={range_header:?} -> {resolution:?}",
            target.size, target.modified
        ));

        stream_content(self.fs.as_ref(), &target, resolution, &self.settings).await
    }
}

impl ProtocolHandler for SchemeHandler {
    fn handle(&self, request: SchemeRequest, responder: Responder) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            logger::log_error(&format!(
                "No async runtime available to serve {}",
                request.url
            ));
            responder.complete(http::build_500_response());
            return;
        };

        let handler = self.clone();
        runtime.spawn(async move {
            let response = handler.respond(&request).await;
            responder.complete(response);
        });
    }
}

fn log_check_failure(err: &StreamError) {
    match err {
        StreamError::Internal { .. } => logger::log_error(&err.to_string()),
        _ => logger::log_warning(&err.to_string()),
    }
}

fn log_failure(request: &SchemeRequest, err: &StreamError) {
    match err {
        StreamError::NotFound { path } => {
            logger::log_warning(&format!("File not found: {path}"));
        }
        StreamError::EmptyFile { path } => {
            logger::log_warning(&format!("File is empty or damaged: {path}"));
        }
        StreamError::RangeNotSatisfiable { .. } => {
            logger::log_warning(&format!("{err} ({})", request.url));
        }
        StreamError::Internal { .. } => {
            logger::log_error(&format!(
                "{err}; url: {}; headers: {:?}",
                request.url, request.headers
            ));
        }
    }
}
