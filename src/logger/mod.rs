//! Logger module
//!
//! Provides logging utilities for the stream handler including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Leveled error, warning, info and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::{Config, LoggingConfig};
use hyper::HeaderMap;
use std::net::SocketAddr;

/// Log severity, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    /// Parse a level name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" | "trace" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Whether a message at `level` passes a filter set to `self`
    pub fn allows(self, level: Self) -> bool {
        level <= self
    }
}

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let level = Level::parse(&config.level);
    writer::init(
        level.unwrap_or(Level::Info),
        config.access_log_file.as_deref(),
        config.error_log_file.as_deref(),
    )?;
    if level.is_none() {
        log_warning(&format!(
            "Unknown log level '{}', using info",
            config.level
        ));
    }
    Ok(())
}

fn write(level: Level, message: &str) {
    if let Some(w) = writer::get() {
        w.write(level, message);
    } else if Level::Info.allows(level) {
        match level {
            Level::Error | Level::Warn => eprintln!("{message}"),
            Level::Info | Level::Debug => println!("{message}"),
        }
    }
}

/// Whether debug lines would be written; lets callers skip formatting
pub fn debug_enabled() -> bool {
    writer::get().is_some_and(|w| w.level().allows(Level::Debug))
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    log_info("======================================");
    log_info("Video stream server started successfully");
    log_info(&format!("Listening on: http://{addr}"));
    log_info(&format!("Scheme: {}://", config.scheme.name));
    log_info(&format!("Content-Type: {}", config.scheme.content_type));
    log_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        log_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        log_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        log_info(&format!("Error log: {path}"));
    }
    log_info("======================================\n");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log_debug(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    log_error(&format!("Failed to serve connection: {err:?}"));
}

pub fn log_info(message: &str) {
    write(Level::Info, message);
}

pub fn log_debug(message: &str) {
    write(Level::Debug, &format!("[DEBUG] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

/// Log request headers, one per line, when enabled
pub fn log_headers(headers: &HeaderMap, show: bool) {
    if !show {
        return;
    }
    log_info(&format!("[Headers] Count: {}", headers.len()));
    for (name, value) in headers {
        log_info(&format!(
            "[Headers]   {name}: {}",
            value.to_str().unwrap_or("<non-ascii>")
        ));
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    if let Some(w) = writer::get() {
        w.write_access(&line);
    } else {
        println!("{line}");
    }
}
