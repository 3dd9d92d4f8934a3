// Connection handling module
// Serves one TCP connection, relaying each HTTP request to the host runtime

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Incoming;
use hyper::header::{REFERER, RANGE, USER_AGENT};
use hyper::http::uri::PathAndQuery;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Request, Response, Uri};
use hyper_util::rt::{TokioIo, TokioTimer};

use crate::config::AppState;
use crate::host::SchemeRequest;
use crate::http::{self, HyperBody, StreamResponse};
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = state.active_connections.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            state.active_connections.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.cached_access_log.load(Ordering::Relaxed) {
        logger::log_connection_accepted(&peer_addr);
    }
    // Small range responses should not wait on Nagle
    if let Err(e) = stream.set_nodelay(true) {
        logger::log_debug(&format!("Could not set TCP_NODELAY for {peer_addr}: {e}"));
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve a connection in a spawned task.
///
/// Only header reads are timed out: a paused viewer may keep a body
/// stream open for as long as it likes.
fn handle_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);
        let header_timeout = state.config.performance.header_read_timeout;
        if header_timeout > 0 {
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(Duration::from_secs(header_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&service_state);
                async move { Ok::<_, Infallible>(serve_request(req, peer_addr, &state).await) }
            }),
        );

        if let Err(err) = conn.await {
            // Viewers cancel range fetches constantly while scrubbing
            if err.is_incomplete_message() || err.is_canceled() {
                logger::log_debug(&format!("Connection from {peer_addr} closed early: {err}"));
            } else {
                logger::log_connection_error(&err);
            }
        }

        state.active_connections.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Relay one HTTP request through the host runtime
pub async fn serve_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    state: &AppState,
) -> Response<HyperBody> {
    let started = Instant::now();
    let url = scheme_url(&state.config.scheme.name, req.uri());

    logger::log_headers(req.headers(), state.config.logging.show_headers);

    let mut entry = state
        .cached_access_log
        .load(Ordering::Relaxed)
        .then(|| access_entry(&req, peer_addr, &url));

    let (parts, _body) = req.into_parts();
    let request = SchemeRequest {
        url,
        method: parts.method,
        headers: parts.headers,
    };

    let response = match state.host.dispatch(request).await {
        Ok(response) => response,
        Err(_) => {
            logger::log_error("Response channel closed without a response");
            http::build_500_response()
        }
    };

    if let Some(entry) = entry.as_mut() {
        record_response(entry, &response, started);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    response.into_hyper()
}

/// Map an HTTP request target onto the custom scheme
///
/// `/home/me/a.mp4` becomes `pipeline-video:///home/me/a.mp4`; an
/// absolute-form target already using the scheme passes through.
pub fn scheme_url(scheme: &str, uri: &Uri) -> String {
    if uri
        .scheme_str()
        .is_some_and(|s| s.eq_ignore_ascii_case(scheme))
    {
        return uri.to_string();
    }
    let target = uri.path_and_query().map_or("/", PathAndQuery::as_str);
    format!("{scheme}://{target}")
}

/// Fill in the response side of an access entry
///
/// The access line is written once the response head is ready, before the
/// body is streamed, so the length is the declared one.
fn record_response(entry: &mut AccessLogEntry, response: &StreamResponse, started: Instant) {
    entry.status = response.status.as_u16();
    entry.content_length = response.content_length().unwrap_or(0);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
}

fn access_entry(req: &Request<Incoming>, peer_addr: SocketAddr, url: &str) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        url.to_string(),
    );
    entry.http_version = format!("{:?}", req.version())
        .trim_start_matches("HTTP/")
        .to_string();
    entry.range = header_string(req.headers(), &RANGE);
    entry.referer = header_string(req.headers(), &REFERER);
    entry.user_agent = header_string(req.headers(), &USER_AGENT);
    entry
}

fn header_string(headers: &HeaderMap, name: &hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_url_from_origin_form() {
        let uri: Uri = "/home/me/a.mp4".parse().unwrap();
        assert_eq!(
            scheme_url("pipeline-video", &uri),
            "pipeline-video:///home/me/a.mp4"
        );

        let uri: Uri = "/C:/Videos/a%20b.mp4?t=3".parse().unwrap();
        assert_eq!(
            scheme_url("pipeline-video", &uri),
            "pipeline-video:///C:/Videos/a%20b.mp4?t=3"
        );
    }

    #[test]
    fn test_scheme_url_from_absolute_http_form() {
        let uri: Uri = "http://127.0.0.1:8765/tmp/a.mp4".parse().unwrap();
        assert_eq!(
            scheme_url("pipeline-video", &uri),
            "pipeline-video:///tmp/a.mp4"
        );
    }

    #[test]
    fn test_record_response_uses_declared_length() {
        // A body that is never polled: nothing has been written yet
        let body: http::BodyStream = Box::pin(futures::stream::pending());
        let response = http::build_partial_response("video/mp4", 100, 199, 1000, body);

        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "pipeline-video:///tmp/a.mp4".to_string(),
        );
        record_response(&mut entry, &response, Instant::now());
        assert_eq!(entry.status, 206);
        assert_eq!(entry.content_length, 100);

        let mut entry = AccessLogEntry::new(
            "127.0.0.1".to_string(),
            "GET".to_string(),
            "pipeline-video:///tmp/missing.mp4".to_string(),
        );
        record_response(&mut entry, &http::build_404_response(), Instant::now());
        assert_eq!(entry.status, 404);
        assert_eq!(entry.content_length, 0);
    }

    #[test]
    fn test_scheme_url_passthrough() {
        let uri: Uri = "pipeline-video://media/tmp/a.mp4".parse().unwrap();
        assert_eq!(
            scheme_url("pipeline-video", &uri),
            "pipeline-video://media/tmp/a.mp4"
        );
    }
}
