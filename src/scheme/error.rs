//! Failure taxonomy and its mapping to responses
//!
//! | Failure | Status |
//! |---|---|
//! | `NotFound` | 404, no body |
//! | `EmptyFile` | 416, "File is empty" |
//! | `RangeNotSatisfiable` | 416, "Range Not Satisfiable: bytes s-e/size" |
//! | `Internal` | 500, no body |

use hyper::StatusCode;
use std::io;
use thiserror::Error;

use crate::http::{self, StreamResponse};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("File is empty")]
    EmptyFile { path: String },

    #[error("Range Not Satisfiable: bytes {start}-{end}/{file_size}")]
    RangeNotSatisfiable { start: u64, end: u64, file_size: u64 },

    #[error("failed to serve {path}: {source}")]
    Internal {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StreamError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::EmptyFile { .. } | Self::RangeNotSatisfiable { .. } => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into the one response sent for this request
    pub fn into_response(self) -> StreamResponse {
        match self {
            Self::NotFound { .. } => http::build_404_response(),
            Self::EmptyFile { .. } => http::build_416_response(self.to_string(), 0),
            Self::RangeNotSatisfiable { file_size, .. } => {
                http::build_416_response(self.to_string(), file_size)
            }
            Self::Internal { .. } => http::build_500_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseBody;

    #[test]
    fn test_not_found() {
        let err = StreamError::NotFound {
            path: "/nope.mp4".to_string(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        let response = err.into_response();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(matches!(response.body, ResponseBody::Empty));
    }

    #[test]
    fn test_empty_file_message() {
        let response = StreamError::EmptyFile {
            path: "/empty.mp4".to_string(),
        }
        .into_response();
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.message.as_deref(), Some("File is empty"));
    }

    #[test]
    fn test_range_message_carries_window_and_size() {
        let response = StreamError::RangeNotSatisfiable {
            start: 1000,
            end: 1005,
            file_size: 1000,
        }
        .into_response();
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(
            response.message.as_deref(),
            Some("Range Not Satisfiable: bytes 1000-1005/1000")
        );
    }

    #[test]
    fn test_internal_has_no_body() {
        let err = StreamError::Internal {
            path: "/a.mp4".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("denied"));
        let response = err.into_response();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(response.body, ResponseBody::Empty));
    }
}
