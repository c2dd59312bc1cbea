//! Datasource repository.
//!
//! CRUD over datasource records with the secret boundary applied around
//! configuration fields: on the way in, every schema-marked secret field is
//! protected by the vault (already-protected values pass through unchanged,
//! so re-saving a stored config is idempotent); on the way out, callers use
//! [`DatasourceRepository::reveal_secrets`] to obtain a transient plaintext
//! copy just before handing config to a driver.

use crate::domain::{
    ConfigMap, CreateDatasourceRequest, DatasourceId, DatasourceRecord, ExtensionManifest,
    ProjectId, UpdateDatasourceRequest,
};
use crate::errors::{Result, SourceplaneError};
use crate::extensions::ExtensionRegistry;
use crate::secrets::{SecretContext, SecretVault};
use crate::storage::store::KvStore;
use dashmap::DashMap;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Keyspace prefix for datasource records
const KEYSPACE: &str = "datasource";

/// Repository for datasource records
#[derive(Debug, Clone)]
pub struct DatasourceRepository {
    store: Arc<dyn KvStore>,
    registry: Arc<ExtensionRegistry>,
    vault: Arc<SecretVault>,
    /// Compiled config-schema cache keyed by extension id
    validators: Arc<DashMap<String, Arc<Validator>>>,
}

impl DatasourceRepository {
    pub fn new(
        store: Arc<dyn KvStore>,
        registry: Arc<ExtensionRegistry>,
        vault: Arc<SecretVault>,
    ) -> Self {
        Self { store, registry, vault, validators: Arc::new(DashMap::new()) }
    }

    fn key(id: &DatasourceId) -> String {
        format!("{}/{}", KEYSPACE, id)
    }

    /// List every datasource record
    #[instrument(skip(self), name = "db_find_all_datasources")]
    pub async fn find_all(&self) -> Result<Vec<DatasourceRecord>> {
        let values = self.store.scan(&format!("{}/", KEYSPACE)).await?;
        values
            .iter()
            .map(|value| {
                serde_json::from_str(value).map_err(|e| SourceplaneError::Serialization {
                    source: e,
                    context: "Failed to decode stored datasource record".to_string(),
                })
            })
            .collect()
    }

    /// Fetch one record; absent records are `Ok(None)`
    #[instrument(skip(self), name = "db_find_datasource")]
    pub async fn find_by_id(&self, id: &DatasourceId) -> Result<Option<DatasourceRecord>> {
        match self.store.get(&Self::key(id)).await? {
            Some(value) => {
                let record =
                    serde_json::from_str(&value).map_err(|e| SourceplaneError::Serialization {
                        source: e,
                        context: format!("Failed to decode datasource record '{}'", id),
                    })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List the records belonging to one project
    #[instrument(skip(self), name = "db_find_datasources_by_project")]
    pub async fn find_by_project_id(&self, project_id: &ProjectId) -> Result<Vec<DatasourceRecord>> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .filter(|record| &record.project_id == project_id)
            .collect())
    }

    /// Create a new datasource.
    ///
    /// The configuration is validated against the owning extension's schema
    /// before any secret is protected, so validation errors never leave
    /// half-protected state behind.
    #[instrument(
        skip(self, request),
        fields(datasource_name = %request.name, extension_id = %request.extension_id),
        name = "db_create_datasource"
    )]
    pub async fn create(&self, request: CreateDatasourceRequest) -> Result<DatasourceRecord> {
        if request.name.trim().is_empty() {
            return Err(SourceplaneError::validation_field("Datasource name is required", "name"));
        }

        let manifest = self
            .registry
            .get(&request.extension_id)
            .ok_or_else(|| SourceplaneError::extension_not_found(&request.extension_id))?;
        if manifest.driver(&request.driver_id).is_none() {
            return Err(SourceplaneError::driver_not_found(
                &request.extension_id,
                &request.driver_id,
            ));
        }
        self.validate_config(&manifest, &request.configuration)?;

        let id = DatasourceId::new();
        let now = chrono::Utc::now();
        let configuration =
            self.protect_config(&manifest, request.configuration, id.as_str())?;

        let record = DatasourceRecord {
            id: id.clone(),
            project_id: request.project_id,
            name: request.name,
            extension_id: request.extension_id,
            driver_id: request.driver_id,
            kind: request.kind,
            configuration,
            paused: false,
            created_at: now,
            updated_at: now,
            created_by: request.created_by.clone(),
            updated_by: request.created_by,
        };

        self.persist(&record).await?;
        info!(
            datasource_id = %record.id,
            extension_id = %record.extension_id,
            driver_id = %record.driver_id,
            "Created datasource"
        );
        Ok(record)
    }

    /// Update an existing datasource; unknown ids fail with `NotFound`
    #[instrument(skip(self, request), name = "db_update_datasource")]
    pub async fn update(
        &self,
        id: &DatasourceId,
        request: UpdateDatasourceRequest,
    ) -> Result<DatasourceRecord> {
        let mut record = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| SourceplaneError::not_found("Datasource", id.as_str()))?;

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(SourceplaneError::validation_field(
                    "Datasource name is required",
                    "name",
                ));
            }
            record.name = name;
        }

        if let Some(configuration) = request.configuration {
            let manifest = self
                .registry
                .get(&record.extension_id)
                .ok_or_else(|| SourceplaneError::extension_not_found(&record.extension_id))?;
            self.validate_config(&manifest, &configuration)?;
            record.configuration = self.protect_config(&manifest, configuration, id.as_str())?;
        }

        if let Some(paused) = request.paused {
            record.paused = paused;
        }
        if request.updated_by.is_some() {
            record.updated_by = request.updated_by;
        }
        record.updated_at = chrono::Utc::now();

        self.persist(&record).await?;
        info!(datasource_id = %record.id, "Updated datasource");
        Ok(record)
    }

    /// Delete a datasource; unknown ids fail with `NotFound`
    #[instrument(skip(self), name = "db_delete_datasource")]
    pub async fn delete(&self, id: &DatasourceId) -> Result<()> {
        if !self.store.delete(&Self::key(id)).await? {
            return Err(SourceplaneError::not_found("Datasource", id.as_str()));
        }
        info!(datasource_id = %id, "Deleted datasource");
        Ok(())
    }

    /// Replace every protected field of `configuration` with its revealed
    /// plaintext, returning a new mapping.
    ///
    /// The input is never mutated, non-secret fields pass through
    /// untouched, and any corrupted value aborts the whole reveal; a
    /// partially revealed config is worse than none.
    pub fn reveal_secrets(&self, configuration: &ConfigMap) -> Result<ConfigMap> {
        let mut revealed = ConfigMap::new();
        for (field, value) in configuration {
            let out = match value.as_str() {
                Some(s) if self.vault.is_protected(s) => {
                    let plaintext = self.vault.reveal(s).map_err(|e| match e {
                        SourceplaneError::NotProtected { .. } => {
                            SourceplaneError::not_protected_field(field)
                        }
                        other => other,
                    })?;
                    Value::String(plaintext.expose_secret().to_string())
                }
                _ => value.clone(),
            };
            revealed.insert(field.clone(), out);
        }
        Ok(revealed)
    }

    /// Drop compiled schema validators (extension hot-reload)
    pub fn clear_schema_cache(&self) {
        self.validators.clear();
    }

    async fn persist(&self, record: &DatasourceRecord) -> Result<()> {
        let value = serde_json::to_string(record).map_err(|e| SourceplaneError::Serialization {
            source: e,
            context: format!("Failed to encode datasource record '{}'", record.id),
        })?;
        self.store.put(&Self::key(&record.id), value).await
    }

    fn validate_config(&self, manifest: &ExtensionManifest, configuration: &ConfigMap) -> Result<()> {
        let validator = self.get_or_compile_validator(manifest)?;
        let instance = Value::Object(configuration.clone());

        let problems: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        if !problems.is_empty() {
            return Err(SourceplaneError::validation(format!(
                "Configuration for extension '{}' is invalid: {}",
                manifest.id,
                problems.join("; ")
            )));
        }
        Ok(())
    }

    fn get_or_compile_validator(&self, manifest: &ExtensionManifest) -> Result<Arc<Validator>> {
        if let Some(validator) = self.validators.get(&manifest.id) {
            return Ok(Arc::clone(&validator));
        }
        let validator = Arc::new(manifest.schema.compile()?);
        self.validators.insert(manifest.id.clone(), Arc::clone(&validator));
        Ok(validator)
    }

    /// Protect every schema-marked secret field of `configuration`.
    ///
    /// Values already in protected form pass through unchanged, so saving a
    /// previously stored config back does not double-wrap its secrets.
    fn protect_config(
        &self,
        manifest: &ExtensionManifest,
        configuration: ConfigMap,
        datasource_id: &str,
    ) -> Result<ConfigMap> {
        let mut protected = ConfigMap::new();
        for (field, value) in configuration {
            if !manifest.schema.is_secret_field(&field) {
                protected.insert(field, value);
                continue;
            }
            let plaintext = match &value {
                Value::String(s) => s,
                _ => {
                    return Err(SourceplaneError::validation_field(
                        format!("Secret field '{}' must be a string", field),
                        field,
                    ))
                }
            };
            if self.vault.is_protected(plaintext) {
                protected.insert(field, value);
                continue;
            }
            let wrapped = self
                .vault
                .protect(plaintext, SecretContext::with_datasource(&field, datasource_id))?;
            protected.insert(field, Value::String(wrapped));
        }
        Ok(protected)
    }
}
