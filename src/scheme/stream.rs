//! Content streaming
//!
//! Builds the 200/206 response for a resolved window. The body is a lazy
//! stream that owns its read handle, so the handle is released when the
//! stream finishes, fails, or is dropped by a departing consumer.

use bytes::{Bytes, BytesMut};
use futures::stream;
use std::io;
use tokio::io::AsyncReadExt;

use super::error::StreamError;
use super::fs::{ByteReader, FileTarget, FilesystemAccess};
use crate::config::SchemeConfig;
use crate::http::{self, BodyStream, ByteWindow, RangeResolution, StreamResponse};

/// Per-handler streaming settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    /// Scheme name the handler answers for
    pub scheme: String,
    /// Fixed media type of served files
    pub content_type: String,
    /// Largest chunk pushed to the consumer at once
    pub read_buffer_size: usize,
}

impl StreamSettings {
    pub fn from_config(config: &SchemeConfig) -> Self {
        Self {
            scheme: config.name.clone(),
            content_type: config.content_type.clone(),
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            scheme: "pipeline-video".to_string(),
            content_type: "video/mp4".to_string(),
            read_buffer_size: 64 * 1024,
        }
    }
}

/// Build the response for `resolution` over `target`
///
/// The read handle is opened before the response is produced, so a file
/// that cannot be opened becomes a 500 instead of a broken 200.
pub async fn stream_content(
    fs: &dyn FilesystemAccess,
    target: &FileTarget,
    resolution: RangeResolution,
    settings: &StreamSettings,
) -> Result<StreamResponse, StreamError> {
    let (window, partial) = match resolution {
        RangeResolution::Full(window) => (window, false),
        RangeResolution::Partial(window) => (window, true),
        RangeResolution::NotSatisfiable {
            start,
            end,
            file_size,
        } => {
            return Err(StreamError::RangeNotSatisfiable {
                start,
                end,
                file_size,
            })
        }
    };
    debug_assert!(window.start <= window.end && window.end < target.size);

    let body = open_body(fs, target, window, settings.read_buffer_size).await?;

    let response = if partial {
        http::build_partial_response(
            &settings.content_type,
            window.start,
            window.end,
            target.size,
            body,
        )
    } else {
        http::build_full_response(&settings.content_type, target.size, body)
    };
    Ok(response)
}

async fn open_body(
    fs: &dyn FilesystemAccess,
    target: &FileTarget,
    window: ByteWindow,
    buffer_size: usize,
) -> Result<BodyStream, StreamError> {
    let reader = fs
        .open_at(&target.path, window.start)
        .await
        .map_err(|source| StreamError::Internal {
            path: target.path.display().to_string(),
            source,
        })?;
    Ok(window_stream(reader, window.chunk_size(), buffer_size))
}

struct WindowReader {
    reader: ByteReader,
    remaining: u64,
    buffer_size: usize,
}

/// Stream exactly `length` bytes from `reader`, at most `buffer_size` at a time
///
/// A file that ends before `length` bytes yields an `UnexpectedEof` error
/// rather than a silently short body.
pub fn window_stream(reader: ByteReader, length: u64, buffer_size: usize) -> BodyStream {
    let state = WindowReader {
        reader,
        remaining: length,
        buffer_size: buffer_size.max(1),
    };

    Box::pin(stream::try_unfold(state, |mut state| async move {
        if state.remaining == 0 {
            return Ok(None);
        }

        let want = usize::try_from(state.remaining)
            .map_or(state.buffer_size, |remaining| remaining.min(state.buffer_size));
        let mut buf = BytesMut::zeroed(want);
        let n = state.reader.read(&mut buf).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended with {} bytes of the window unread", state.remaining),
            ));
        }

        buf.truncate(n);
        state.remaining -= n as u64;
        Ok::<_, io::Error>(Some((Bytes::from(buf), state)))
    }))
}
