// Configuration module entry point
// Manages application configuration and runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, CorsConfig, PerformanceConfig};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Missing files are allowed, every key has a default
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8032)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.show_headers", false)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default(
                "http.server_name",
                concat!("api-basics/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .set_default("cors.allow_origins", vec!["*"])?
            .set_default("cors.allow_methods", vec!["*"])?
            .set_default("cors.allow_headers", vec!["*"])?
            .set_default("cors.allow_credentials", true)?
            .set_default("cors.max_age", 600)?
            .set_default("upload.dir", "temp")?
            .build()?;

        settings.try_deserialize()
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
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.port, 8032);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.upload.dir, "temp");
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert!(cfg.cors.allows_all_origins());
        assert!(cfg.cors.allow_credentials);
        assert_eq!(cfg.logging.access_log_format, "combined");
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        let addr = cfg.get_socket_addr().unwrap();
        assert_eq!(addr.port(), 8032);
        assert!(addr.ip().is_unspecified());
    }
}
