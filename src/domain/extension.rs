//! Extension manifest domain types.
//!
//! An extension is a self-describing plugin: identity and presentation
//! fields, the scope it plugs into, a JSON Schema for its configuration,
//! and the drivers it offers. Manifests are the wire/storage format for a
//! registered extension and must round-trip through serde without loss.
//!
//! ## Secret markers
//!
//! A schema property is considered secret when its definition carries
//! `"secret": true` or `"format": "password"`. The repository uses these
//! markers to decide which config fields pass through the vault.

use crate::errors::{Result, SourceplaneError};
use jsonschema::{Draft, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Scope an extension plugs into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtensionScope {
    /// Datasource connectivity extensions
    Datasource,
}

impl ExtensionScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Datasource => "DATASOURCE",
        }
    }
}

impl FromStr for ExtensionScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "DATASOURCE" => Ok(Self::Datasource),
            _ => Err(format!("Unknown extension scope: {}", s)),
        }
    }
}

impl fmt::Display for ExtensionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Execution environment a driver is written for.
///
/// Closed tagged variant: the resolver dispatches on this exhaustively, so
/// adding a runtime kind is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverRuntime {
    /// Co-located with the server process; loaded through the host's normal
    /// module-loading mechanism, never fetched over the network
    Node,
    /// Sandboxed client runtime; the bundle is fetched dynamically
    Browser,
}

impl DriverRuntime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Browser => "browser",
        }
    }
}

impl FromStr for DriverRuntime {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "browser" => Ok(Self::Browser),
            _ => Err(format!("Unknown driver runtime: {}", s)),
        }
    }
}

impl fmt::Display for DriverRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One concrete driver offered by an extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDescriptor {
    /// Unique within the owning extension
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<DriverRuntime>,
    /// Entry filename for dynamically loaded runtimes; defaults to the
    /// conventional driver bundle name when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl DriverDescriptor {
    /// Declared runtime, defaulting to the co-located server runtime
    pub fn effective_runtime(&self) -> DriverRuntime {
        self.runtime.unwrap_or(DriverRuntime::Node)
    }
}

/// JSON Schema describing an extension's accepted configuration fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSchema(Value);

impl ConfigSchema {
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Compile this schema, surfacing invalid schemas as validation errors
    pub fn compile(&self) -> Result<Validator> {
        Validator::options().with_draft(Draft::Draft7).build(&self.0).map_err(|e| {
            SourceplaneError::validation(format!("Invalid configuration schema: {}", e))
        })
    }

    /// Names of the properties marked secret by this schema
    pub fn secret_fields(&self) -> Vec<&str> {
        self.0
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .filter(|(_, def)| Self::is_secret_definition(def))
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether a single named field is schema-marked secret
    pub fn is_secret_field(&self, name: &str) -> bool {
        self.0
            .get("properties")
            .and_then(|p| p.get(name))
            .map(Self::is_secret_definition)
            .unwrap_or(false)
    }

    fn is_secret_definition(def: &Value) -> bool {
        def.get("secret").and_then(Value::as_bool).unwrap_or(false)
            || def.get("format").and_then(Value::as_str) == Some("password")
    }
}

/// Self-describing extension manifest (wire format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    /// Globally unique, stable id; immutable once registered
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub scope: ExtensionScope,
    pub schema: ConfigSchema,
    #[serde(default)]
    pub drivers: Vec<DriverDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_config: Option<Value>,
}

impl ExtensionManifest {
    /// Find a driver descriptor by id
    pub fn driver(&self, driver_id: &str) -> Option<&DriverDescriptor> {
        self.drivers.iter().find(|d| d.id == driver_id)
    }

    /// Structural self-checks, run before the manifest enters the registry.
    ///
    /// An extension with zero drivers is valid here; it simply cannot be
    /// materialized into a usable datasource later.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SourceplaneError::validation_field("Extension id is required", "id"));
        }
        if !self.id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            return Err(SourceplaneError::validation_field(
                "Extension id must contain only alphanumeric characters, '-', '_' or '.'",
                "id",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(SourceplaneError::validation_field("Extension name is required", "name"));
        }
        if !self.schema.as_value().is_object() {
            return Err(SourceplaneError::validation_field(
                "Configuration schema must be a JSON object",
                "schema",
            ));
        }
        self.schema.compile()?;

        let mut seen = std::collections::HashSet::new();
        for driver in &self.drivers {
            if driver.id.trim().is_empty() {
                return Err(SourceplaneError::validation_field(
                    format!("Driver of extension '{}' is missing an id", self.id),
                    "drivers",
                ));
            }
            if !seen.insert(driver.id.as_str()) {
                return Err(SourceplaneError::validation_field(
                    format!("Duplicate driver id '{}' in extension '{}'", driver.id, self.id),
                    "drivers",
                ));
            }
            if let Some(entry) = &driver.entry {
                // The entry lands in a load URL; only plain filenames allowed.
                if entry.is_empty() || entry.contains('/') || entry.contains("..") {
                    return Err(SourceplaneError::validation_field(
                        format!("Driver '{}' has an invalid entry filename", driver.id),
                        "drivers",
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_json() -> Value {
        json!({
            "id": "postgresql",
            "name": "PostgreSQL",
            "description": "Connect to PostgreSQL databases",
            "icon": "postgresql.svg",
            "scope": "DATASOURCE",
            "schema": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer" },
                    "password": { "type": "string", "secret": true }
                },
                "required": ["host"]
            },
            "drivers": [
                { "id": "postgresql.default", "name": "Default", "runtime": "node" },
                { "id": "postgresql.wasm", "name": "Sandboxed", "runtime": "browser", "entry": "pg.js" }
            ],
            "formConfig": { "order": ["host", "port", "password"] }
        })
    }

    #[test]
    fn manifest_roundtrips_without_loss() {
        let value = manifest_json();
        let manifest: ExtensionManifest = serde_json::from_value(value.clone()).unwrap();
        let back = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn manifest_validates() {
        let manifest: ExtensionManifest = serde_json::from_value(manifest_json()).unwrap();
        manifest.validate().expect("well-formed manifest");
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut value = manifest_json();
        value["id"] = json!("");
        let manifest: ExtensionManifest = serde_json::from_value(value).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn duplicate_driver_ids_are_rejected() {
        let mut value = manifest_json();
        value["drivers"][1]["id"] = json!("postgresql.default");
        let manifest: ExtensionManifest = serde_json::from_value(value).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn traversal_entry_is_rejected() {
        let mut value = manifest_json();
        value["drivers"][1]["entry"] = json!("../../etc/passwd");
        let manifest: ExtensionManifest = serde_json::from_value(value).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn zero_drivers_is_valid() {
        let mut value = manifest_json();
        value["drivers"] = json!([]);
        let manifest: ExtensionManifest = serde_json::from_value(value).unwrap();
        manifest.validate().expect("driverless manifests are registrable");
    }

    #[test]
    fn secret_fields_are_detected() {
        let manifest: ExtensionManifest = serde_json::from_value(manifest_json()).unwrap();
        assert_eq!(manifest.schema.secret_fields(), vec!["password"]);
        assert!(manifest.schema.is_secret_field("password"));
        assert!(!manifest.schema.is_secret_field("host"));
    }

    #[test]
    fn password_format_marks_secret() {
        let schema = ConfigSchema::new(json!({
            "type": "object",
            "properties": { "apiKey": { "type": "string", "format": "password" } }
        }));
        assert!(schema.is_secret_field("apiKey"));
    }

    #[test]
    fn runtime_defaults_to_node() {
        let descriptor = DriverDescriptor {
            id: "x.default".into(),
            name: "X".into(),
            description: None,
            runtime: None,
            entry: None,
        };
        assert_eq!(descriptor.effective_runtime(), DriverRuntime::Node);
    }

    #[test]
    fn runtime_roundtrip() {
        for runtime in [DriverRuntime::Node, DriverRuntime::Browser] {
            let parsed: DriverRuntime = runtime.as_str().parse().unwrap();
            assert_eq!(runtime, parsed);
        }
        assert!("wasm".parse::<DriverRuntime>().is_err());
    }
}
