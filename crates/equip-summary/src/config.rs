//! Configuration for the summary service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::MAX_HISTORY_CAPACITY;

/// Environment variable naming a TOML config file
pub const CONFIG_ENV: &str = "EQUIP_SUMMARY_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// History store configuration
    pub storage: StorageConfig,
    /// Token authentication configuration
    pub auth: AuthConfig,
    /// Upload schema configuration
    pub schema: SchemaConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    ///
    /// When `path` is `None` the file named by `EQUIP_SUMMARY_CONFIG` is used, if set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("EQUIP_SUMMARY_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("EQUIP_SUMMARY_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid EQUIP_SUMMARY_PORT '{}': {}", port, e)))?;
        }
        if let Ok(path) = std::env::var("EQUIP_SUMMARY_DB_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(secret) = std::env::var("EQUIP_SUMMARY_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        Ok(())
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.storage.history_capacity == 0 {
            return Err(Error::Config("storage.history_capacity must be at least 1".to_string()));
        }
        if self.storage.history_capacity > MAX_HISTORY_CAPACITY {
            return Err(Error::Config(format!(
                "storage.history_capacity must be at most {}",
                MAX_HISTORY_CAPACITY
            )));
        }
        if self.auth.jwt_secret.len() < 16 {
            return Err(Error::Config("auth.jwt_secret must be at least 16 bytes".to_string()));
        }
        if self.auth.access_token_ttl_secs == 0 || self.auth.refresh_token_ttl_secs == 0 {
            return Err(Error::Config("token lifetimes must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 10MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// History store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,
    /// How long a writer waits on a locked database before failing (ms)
    pub busy_timeout_ms: u64,
    /// Number of uploads retained
    pub history_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
            .join("equip-summary")
            .join("history.db");

        Self {
            database_path,
            busy_timeout_ms: 5_000,
            history_capacity: crate::storage::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Token authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 5 minutes)
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 1 day)
    pub refresh_token_ttl_secs: u64,
    /// Accounts allowed to log in
    pub users: Vec<UserCredential>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-equip-summary-secret".to_string(),
            access_token_ttl_secs: 300,
            refresh_token_ttl_secs: 86_400,
            users: Vec::new(),
        }
    }
}

/// A login account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub username: String,
    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
}

impl UserCredential {
    /// Build a credential from a plaintext password
    pub fn with_password(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password_sha256: crate::auth::hash_password(password),
        }
    }
}

/// Upload schema configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Columns that must be present in the header row
    pub required_columns: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            required_columns: vec![crate::ingestion::TYPE_COLUMN.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.history_capacity, 5);
        assert_eq!(config.schema.required_columns, vec!["Type".to_string()]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9100

            [[auth.users]]
            username = "operator"
            password_sha256 = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.auth.users.len(), 1);
        assert_eq!(config.storage.history_capacity, 5);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.storage.history_capacity = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_capacity_above_maximum_rejected() {
        let config = AppConfig::from_toml_str("[storage]\nhistory_capacity = 10\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = AppConfig::from_toml_str("[storage]\nhistory_capacity = 5\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml_str("server = 3").is_err());
    }
}
