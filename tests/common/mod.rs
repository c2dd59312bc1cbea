//! Shared helpers for integration tests.

use base64::Engine;
use sourceplane::config::{AppConfig, VaultConfig};
use sourceplane::domain::ExtensionManifest;
use serde_json::json;

/// App config with a fixed vault key, suitable only for tests
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.vault = VaultConfig {
        master_key_base64: base64::engine::general_purpose::STANDARD
            .encode([0x42u8; 32])
            .into(),
        key_version: "test".into(),
    };
    config
}

/// The PostgreSQL manifest used across the scenarios
pub fn postgresql_manifest() -> ExtensionManifest {
    serde_json::from_value(json!({
        "id": "postgresql",
        "name": "PostgreSQL",
        "description": "Connect to PostgreSQL databases",
        "scope": "DATASOURCE",
        "schema": {
            "type": "object",
            "properties": {
                "host": { "type": "string" },
                "port": { "type": "integer" },
                "user": { "type": "string" },
                "password": { "type": "string", "secret": true }
            },
            "required": ["host"]
        },
        "drivers": [
            { "id": "postgresql.default", "name": "Default", "runtime": "node" }
        ]
    }))
    .expect("manifest fixture is well-formed")
}
