//! Custom scheme handler module
//!
//! Serves local files for `pipeline-video://` requests: URL parsing, a fresh
//! stat per request, Range resolution, and a lazily streamed body.

pub mod error;
pub mod fs;
pub mod handler;
pub mod media;
pub mod registrar;
pub mod stream;
pub mod url;

// Re-export main entry points
pub use error::StreamError;
pub use fs::{ByteReader, FileTarget, FilesystemAccess, LocalFilesystem};
pub use handler::SchemeHandler;
pub use media::{image_content_type, VideoInfo};
pub use registrar::SchemeRegistrar;
pub use stream::StreamSettings;
pub use url::{parse_scheme_url, ParseError};
