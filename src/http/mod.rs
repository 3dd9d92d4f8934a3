//! HTTP protocol layer module
//!
//! Range resolution and response building, kept free of filesystem and
//! transport concerns.

pub mod range;
pub mod response;

// Re-export commonly used types
pub use range::{resolve_range, ByteWindow, RangeResolution};
pub use response::{
    build_404_response, build_416_response, build_500_response, build_full_response,
    build_partial_response, BodyStream, HyperBody, ResponseBody, StreamResponse,
};
