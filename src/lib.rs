//! pipeline-video
//!
//! Serves local video files through the `pipeline-video://` custom scheme with
//! HTTP Range support, so a media viewer can seek anywhere in a file.
//!
//! Layers, leaf-first:
//! - [`http`]: Range resolution and response building
//! - [`scheme`]: URL parsing, filesystem access, streaming, error mapping,
//!   and the per-request handler
//! - [`host`]: the host runtime (ready signal, protocol registry, dispatch)
//! - [`server`]: loopback HTTP/1.1 front end relaying scheme responses
//! - [`config`] and [`logger`]: ambient configuration and logging

pub mod config;
pub mod host;
pub mod http;
pub mod logger;
pub mod scheme;
pub mod server;
