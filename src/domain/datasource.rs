//! Datasource domain types.
//!
//! A datasource record ties a project to one driver of one extension, plus
//! the configuration the driver needs to connect. Secret configuration
//! fields are always in protected form by the time a record is constructed
//! for persistence; the repository owns that boundary.

use crate::domain::id::{DatasourceId, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration mapping of field name to value
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Connectivity model of a datasource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasourceKind {
    /// Runs inside the workspace process (files, in-memory engines)
    Embedded,
    /// A network-reachable server the user operates
    Remote,
    /// A hosted service reached through its public API
    Saas,
}

impl DatasourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Remote => "remote",
            Self::Saas => "saas",
        }
    }
}

impl FromStr for DatasourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "embedded" => Ok(Self::Embedded),
            "remote" => Ok(Self::Remote),
            "saas" => Ok(Self::Saas),
            _ => Err(format!("Unknown datasource kind: {}", s)),
        }
    }
}

impl fmt::Display for DatasourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted datasource record (storage format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasourceRecord {
    /// Generated at creation, immutable
    pub id: DatasourceId,
    pub project_id: ProjectId,
    pub name: String,
    /// Id of the providing extension
    pub extension_id: String,
    /// Driver id within that extension
    pub driver_id: String,
    pub kind: DatasourceKind,
    /// Field name to value; secret fields are stored in protected form
    pub configuration: ConfigMap,
    /// Consumed by external callers before invoking a driver; this core
    /// never gates on it
    #[serde(default)]
    pub paused: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// Create datasource request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDatasourceRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub extension_id: String,
    pub driver_id: String,
    pub kind: DatasourceKind,
    pub configuration: ConfigMap,
    pub created_by: Option<String>,
}

/// Update datasource request; `None` fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDatasourceRequest {
    pub name: Option<String>,
    pub configuration: Option<ConfigMap>,
    pub paused: Option<bool>,
    pub updated_by: Option<String>,
}
