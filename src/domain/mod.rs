//! Domain model for the datasource extension layer.

pub mod datasource;
pub mod extension;
pub mod id;

pub use datasource::{
    ConfigMap, CreateDatasourceRequest, DatasourceKind, DatasourceRecord, UpdateDatasourceRequest,
};
pub use extension::{
    ConfigSchema, DriverDescriptor, DriverRuntime, ExtensionManifest, ExtensionScope,
};
pub use id::{DatasourceId, DriverInstanceId, EntityKind, IdValidator, ProjectId};
