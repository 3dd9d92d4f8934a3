//! HTTP response building module
//!
//! `StreamResponse` is the single response a scheme request produces. The
//! builders here cover every status the handler emits; `into_hyper` turns a
//! response into something the front end can write to a socket.

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use hyper::ext::ReasonPhrase;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE,
};
use hyper::{Response, StatusCode};
use std::fmt;
use std::io;
use std::pin::Pin;

/// Lazy, finite, single-traversal byte sequence
pub type BodyStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Body type written by the HTTP front end
pub type HyperBody = UnsyncBoxBody<Bytes, io::Error>;

/// Response body
pub enum ResponseBody {
    Empty,
    Text(Bytes),
    Stream(BodyStream),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Response to a single scheme request
#[derive(Debug)]
pub struct StreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Status message, sent as the reason phrase
    pub message: Option<String>,
    pub body: ResponseBody,
}

impl StreamResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            message: None,
            body: ResponseBody::Empty,
        }
    }

    /// Declared `Content-Length`, if any
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    /// Convert into a hyper response with a streaming body
    pub fn into_hyper(self) -> Response<HyperBody> {
        let status = self.status;
        let mut builder = Response::builder().status(status);

        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }

        if let Some(message) = self.message {
            match ReasonPhrase::try_from(message) {
                Ok(reason) => builder = builder.extension(reason),
                Err(e) => log_build_error(status.as_str(), &e),
            }
        }

        let body = match self.body {
            ResponseBody::Empty => Empty::new().map_err(|never| match never {}).boxed_unsync(),
            ResponseBody::Text(text) => Full::new(text)
                .map_err(|never| match never {})
                .boxed_unsync(),
            ResponseBody::Stream(stream) => {
                StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
            }
        };

        builder.body(body).unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            let mut fallback = Response::new(Empty::new().map_err(|never| match never {}).boxed_unsync());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

/// Build 200 OK response delivering the whole file
pub fn build_full_response(content_type: &str, file_size: u64, body: BodyStream) -> StreamResponse {
    let mut response = StreamResponse::new(StatusCode::OK);
    insert_content_type(&mut response.headers, content_type);
    response.headers.insert(CONTENT_LENGTH, HeaderValue::from(file_size));
    response
        .headers
        .insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response.body = ResponseBody::Stream(body);
    response
}

/// Build 206 Partial Content response delivering `[start, end]`
pub fn build_partial_response(
    content_type: &str,
    start: u64,
    end: u64,
    file_size: u64,
    body: BodyStream,
) -> StreamResponse {
    let mut response = StreamResponse::new(StatusCode::PARTIAL_CONTENT);
    insert_content_type(&mut response.headers, content_type);
    insert_formatted(
        &mut response.headers,
        CONTENT_RANGE,
        &format!("bytes {start}-{end}/{file_size}"),
    );
    response
        .headers
        .insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(end - start + 1));
    response.body = ResponseBody::Stream(body);
    response
}

/// Build 404 Not Found response (no body)
pub fn build_404_response() -> StreamResponse {
    StreamResponse::new(StatusCode::NOT_FOUND)
}

/// Build 416 Range Not Satisfiable response
///
/// The message doubles as a plain-text body so clients that drop reason
/// phrases still see what went wrong.
pub fn build_416_response(message: String, file_size: u64) -> StreamResponse {
    let mut response = StreamResponse::new(StatusCode::RANGE_NOT_SATISFIABLE);
    insert_formatted(
        &mut response.headers,
        CONTENT_RANGE,
        &format!("bytes */{file_size}"),
    );
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(message.len()));
    response.body = ResponseBody::Text(Bytes::from(message.clone()));
    response.message = Some(message);
    response
}

/// Build 500 Internal Server Error response (no body)
pub fn build_500_response() -> StreamResponse {
    StreamResponse::new(StatusCode::INTERNAL_SERVER_ERROR)
}

fn insert_content_type(headers: &mut HeaderMap, content_type: &str) {
    match HeaderValue::from_str(content_type) {
        Ok(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        Err(e) => {
            crate::logger::log_error(&format!(
                "Invalid content type '{content_type}': {e}, using application/octet-stream"
            ));
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        }
    }
}

fn insert_formatted(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(e) => log_build_error(name.as_str(), &e),
    }
}

/// Log response build error
fn log_build_error(what: &str, error: &impl fmt::Display) {
    crate::logger::log_error(&format!("Failed to build {what} response: {error}"));
}
