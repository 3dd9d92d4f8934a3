// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use config::builder::{ConfigBuilder, DefaultState};
use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LoggingConfig, PerformanceConfig, SchemeConfig, ServerConfig};

/// Environment variable prefix, e.g. `PIPELINE_VIDEO_SERVER__PORT=9000`
const ENV_PREFIX: &str = "PIPELINE_VIDEO";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder)
    }

    /// Load configuration from TOML text, ignoring files and environment
    pub fn from_toml_str(contents: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8765)?
            .set_default("scheme.name", "pipeline-video")?
            .set_default("scheme.content_type", "video/mp4")?
            .set_default("scheme.read_buffer_size", 65_536)? // 64KB
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .build()?
            .try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8765);
        assert_eq!(cfg.server.workers, None);
        assert_eq!(cfg.scheme.name, "pipeline-video");
        assert_eq!(cfg.scheme.content_type, "video/mp4");
        assert_eq!(cfg.scheme.read_buffer_size, 65_536);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.logging.access_log_file.is_none());
        assert!(cfg.performance.keep_alive);
        assert_eq!(cfg.performance.max_connections, None);
    }

    #[test]
    fn test_overrides() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 9000
            workers = 2

            [scheme]
            name = "clip"
            content_type = "video/webm"
            read_buffer_size = 4096

            [performance]
            max_connections = 16
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.workers, Some(2));
        assert_eq!(cfg.scheme.name, "clip");
        assert_eq!(cfg.scheme.content_type, "video/webm");
        assert_eq!(cfg.scheme.read_buffer_size, 4096);
        assert_eq!(cfg.performance.max_connections, Some(16));
        // untouched sections keep their defaults
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:8765".parse::<SocketAddr>().unwrap()
        );

        let bad = Config::from_toml_str("[server]\nhost = \"not a host\"").unwrap();
        assert!(bad.get_socket_addr().is_err());
    }
}
