//! # Configuration Settings
//!
//! Layered configuration for the sourceplane core. Values come from the
//! environment under the `SOURCEPLANE_` prefix (e.g.
//! `SOURCEPLANE_VAULT__MASTER_KEY_BASE64`), with defaults suitable for a
//! local embedded workspace.

use crate::errors::{Result, SourceplaneError};
use crate::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub database: DatabaseConfig,

    #[validate(nested)]
    pub vault: VaultConfig,

    #[validate(nested)]
    pub resolver: ResolverConfig,

    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("SOURCEPLANE").separator("__"))
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate_all()?;
        Ok(app_config)
    }

    /// Validate the entire configuration
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(SourceplaneError::from)?;
        self.validate_custom()
    }

    /// Custom validation beyond what the validator derive can express
    fn validate_custom(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite://") && self.database.url != "sqlite::memory:" {
            return Err(SourceplaneError::validation(
                "Database URL must start with 'sqlite://'",
            ));
        }

        let origin = self.resolver.origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(SourceplaneError::validation(
                "Extensions origin must be an http(s) URL",
            ));
        }

        if self.vault.master_key_base64.is_empty() {
            return Err(SourceplaneError::config(
                "Vault master key not set. Provide SOURCEPLANE_VAULT__MASTER_KEY_BASE64 \
                 (generate one with: openssl rand -base64 32)",
            ));
        }
        Ok(())
    }
}

/// Embedded database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection string
    #[validate(length(min = 1))]
    pub url: String,

    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite://sourceplane.db".to_string(), max_connections: 5 }
    }
}

/// Secret vault configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VaultConfig {
    /// Base64-encoded 32-byte master encryption key
    pub master_key_base64: SecretString,

    /// Key version for rotation tracking
    #[validate(length(min = 1))]
    pub key_version: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { master_key_base64: SecretString::new(""), key_version: "default".to_string() }
    }
}

impl VaultConfig {
    /// Fixed-key configuration for tests. Never use outside tests.
    #[cfg(test)]
    pub fn for_testing() -> Self {
        use base64::Engine;
        let test_key = [0x42u8; 32];
        Self {
            master_key_base64: base64::engine::general_purpose::STANDARD.encode(test_key).into(),
            key_version: "test".to_string(),
        }
    }
}

/// Driver resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResolverConfig {
    /// Origin serving extension assets (sandboxed driver bundles)
    #[validate(length(min = 1))]
    pub extensions_origin: String,

    /// Timeout for driver bundle fetches, in seconds
    #[validate(range(min = 1, max = 300))]
    pub fetch_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { extensions_origin: "http://localhost:3000".to_string(), fetch_timeout_secs: 30 }
    }
}

impl ResolverConfig {
    /// Parsed extensions origin
    pub fn origin(&self) -> Result<Url> {
        Url::parse(&self.extensions_origin).map_err(|e| {
            SourceplaneError::validation(format!(
                "Invalid extensions origin '{}': {}",
                self.extensions_origin, e
            ))
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default log filter (overridden by RUST_LOG)
    #[validate(length(min = 1))]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,

    #[validate(length(min = 1))]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "sourceplane".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite://sourceplane.db");
        assert_eq!(config.resolver.fetch_timeout(), Duration::from_secs(30));
        assert!(!config.observability.json_logs);
    }

    #[test]
    fn default_config_fails_without_a_vault_key() {
        let config = AppConfig::default();
        let err = config.validate_all().unwrap_err();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn testing_vault_key_passes_validation() {
        let mut config = AppConfig::default();
        config.vault = VaultConfig::for_testing();
        config.validate_all().expect("test key satisfies validation");
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        let mut config = AppConfig::default();
        config.vault = VaultConfig::for_testing();
        config.database.url = "postgresql://localhost/workspace".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn non_http_origin_is_rejected() {
        let mut config = AppConfig::default();
        config.vault = VaultConfig::for_testing();
        config.resolver.extensions_origin = "ftp://host".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn origin_parses() {
        let resolver = ResolverConfig::default();
        assert_eq!(resolver.origin().unwrap().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn serialized_config_redacts_the_master_key() {
        let mut config = AppConfig::default();
        config.vault = VaultConfig::for_testing();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("QkJC")); // no fragment of the base64 key
    }
}
