//! Gateway configuration types.
//!
//! The configuration is a YAML document. Instance settings (listen address,
//! runmode, storage) are read once at startup; the `tables` section is the
//! static policy configuration and is hot-reloaded by [`crate::reload`].
//!
//! ```yaml
//! listen_addr: 0.0.0.0:8080
//! runmode: in
//! data_dir: /data/ihub
//! tables:
//!   outer_service_ports:
//!     store: 9001
//!   admin_endpoints:
//!     billing: [charge]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ihub_auth::IdentityConfig;
use ihub_core::Runmode;
use ihub_policy::PolicyTables;
use ihub_store::StoreError;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "IHUB_CONFIG";

/// Configuration file used when `IHUB_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "ihub-config.yaml";

/// Errors raised while loading configuration or seed data.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid YAML for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An environment override holds an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },

    /// Seed data could not be written to the policy store.
    #[error("failed to seed policy store: {0}")]
    Store(#[from] StoreError),
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Where this gateway instance is deployed.
    #[serde(default = "GatewayConfig::default_runmode")]
    pub runmode: Runmode,

    /// Directory of the embedded policy store.
    #[serde(default = "GatewayConfig::default_data_dir")]
    pub data_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is unset.
    #[serde(default = "GatewayConfig::default_log_level")]
    pub log_level: String,

    /// Allowed CORS origins.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds, applied to the whole pipeline and to
    /// every upstream call.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Port appended to in-cluster hostnames. Unset means the scheme default.
    #[serde(default)]
    pub cluster_port: Option<u16>,

    /// Identity service. Unset disables the identity stage.
    #[serde(default)]
    pub identity: Option<IdentityConfig>,

    /// YAML file of registry rows applied to the store at startup.
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    /// Static policy tables.
    #[serde(default)]
    pub tables: PolicyTables,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_runmode() -> Runmode {
        Runmode::In
    }

    fn default_data_dir() -> PathBuf {
        PathBuf::from("/data/ihub")
    }

    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        10 * 1024 * 1024 // 10 MB
    }

    const fn default_request_timeout() -> u64 {
        60
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Parse a YAML configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the document does not match.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` or `ConfigError::Parse`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    /// Resolve the configuration path from `IHUB_CONFIG`, load it and apply
    /// the environment overrides.
    ///
    /// A missing default file yields the default configuration; a missing
    /// file named by `IHUB_CONFIG` is an error.
    ///
    /// # Errors
    ///
    /// Returns any error of [`GatewayConfig::load`] or
    /// [`GatewayConfig::apply_overrides`].
    pub fn from_env() -> Result<(Self, PathBuf), ConfigError> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok();
        let path = PathBuf::from(explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));

        let config = if explicit.is_none() && !path.exists() {
            tracing::warn!(path = %path.display(), "No configuration file, using defaults");
            Self::default()
        } else {
            Self::load(&path)?
        };

        let config = config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok((config, path))
    }

    /// Apply `LISTEN_ADDR`, `DATA_DIR`, `RUNMODE` and `LOG_LEVEL` overrides
    /// read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` if `RUNMODE` is neither `in` nor `out`.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = lookup("LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(mode) = lookup("RUNMODE") {
            self.runmode = mode.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "RUNMODE",
                value: mode,
            })?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(self)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            runmode: Self::default_runmode(),
            data_dir: Self::default_data_dir(),
            log_level: Self::default_log_level(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            cluster_port: None,
            identity: None,
            seed_file: None,
            tables: PolicyTables::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.runmode, Runmode::In);
        assert_eq!(config.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.identity.is_none());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = GatewayConfig::from_yaml("{}").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.cors_origins, vec!["*".to_string()]);
        assert!(config.tables.outer_service_ports.is_empty());
    }

    #[test]
    fn full_document() {
        let config = GatewayConfig::from_yaml(
            r"
listen_addr: 127.0.0.1:9000
runmode: out
cluster_port: 8080
identity:
  url: http://ibase:8080/whoami
tables:
  outer_service_ports:
    store: 9001
  admin_endpoints:
    billing: [charge]
",
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.runmode, Runmode::Out);
        assert_eq!(config.cluster_port, Some(8080));
        assert_eq!(config.identity.unwrap().timeout_seconds, 10);
        assert_eq!(config.tables.outer_port("store"), Some(9001));
    }

    #[test]
    fn environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("LISTEN_ADDR", "0.0.0.0:9999"),
            ("RUNMODE", "OUT"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let config = GatewayConfig::default()
            .apply_overrides(|name| env.get(name).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:9999");
        assert_eq!(config.runmode, Runmode::Out);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.data_dir, PathBuf::from("/data/ihub"));
    }

    #[test]
    fn invalid_runmode_override() {
        let err = GatewayConfig::default()
            .apply_overrides(|name| (name == "RUNMODE").then(|| "edge".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: "RUNMODE", .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = GatewayConfig::load("/nonexistent/ihub.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
