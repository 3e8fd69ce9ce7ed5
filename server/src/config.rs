use std::path::{Path, PathBuf};
use std::time::Duration;

use itrack_core::error::AppError;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration: embedded defaults, then `path` if given, then `ITRACK__*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ));

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix("ITRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| {
                AppError::config("CONFIG_LOAD_FAILED", "Failed to load configuration")
                    .with_details(e.to_string())
            })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path the incident routes are mounted under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// How long a writer waits on a locked database
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Replace the table with demo incidents at startup
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_seed_count")]
    pub count: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count: default_seed_count(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// Built single-page UI served for non-API paths
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives; `RUST_LOG` takes precedence
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("incidents.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_seed_count() -> usize {
    200
}

fn default_log_filter() -> String {
    "incident_tracker=info,incident_tracker_lib=info,itrack_core=info,tower_http=info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_load() {
        let config = Config::load(None).expect("defaults");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.database.path, PathBuf::from("incidents.db"));
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(5));
        assert!(!config.seed.enabled);
        assert_eq!(config.seed.count, 200);
        assert!(config.ui.static_dir.is_none());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itrack.toml");
        std::fs::write(
            &path,
            "[server]\nport = 8088\n[seed]\nenabled = true\ncount = 12\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.seed.enabled);
        assert_eq!(config.seed.count, 12);
        assert_eq!(config.bind_address(), "127.0.0.1:8088");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert_eq!(err.code, "CONFIG_LOAD_FAILED");
    }
}
