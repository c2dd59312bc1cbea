//! In-memory catalog of registered extension manifests.
//!
//! The registry is process-wide shared state with an explicit lifecycle:
//! constructed once at startup, populated during boot (or hot-reload), and
//! read by everything that needs to know which extensions exist. All access
//! goes through this interface; there is no ambient global.

use crate::domain::{ExtensionManifest, ExtensionScope};
use crate::errors::Result;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Debug, Default)]
struct Catalog {
    by_id: HashMap<String, Arc<ExtensionManifest>>,
    /// First-registration order per scope; re-registration keeps position
    order: Vec<(ExtensionScope, String)>,
}

/// Catalog of extension manifests keyed by id and scope
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    catalog: RwLock<Catalog>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manifest, replacing any prior entry with the same id.
    ///
    /// The manifest's structural self-checks run first; a failing manifest
    /// is rejected before the catalog is touched. Replacement swaps the
    /// whole entry under the write lock, so a concurrent reader sees either
    /// the entire old manifest or the entire new one, never a mix.
    pub fn register(&self, manifest: ExtensionManifest) -> Result<()> {
        manifest.validate()?;

        let entry = Arc::new(manifest);
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = catalog.by_id.insert(entry.id.clone(), Arc::clone(&entry));
        if replaced.is_none() {
            catalog.order.push((entry.scope, entry.id.clone()));
        }

        info!(
            extension_id = %entry.id,
            scope = %entry.scope,
            drivers = entry.drivers.len(),
            replaced = replaced.is_some(),
            "Registered extension"
        );
        Ok(())
    }

    /// Look up a manifest by id
    pub fn get(&self, id: &str) -> Option<Arc<ExtensionManifest>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog.by_id.get(id).cloned()
    }

    /// List manifests of a scope, in first-registration order
    pub fn list(&self, scope: ExtensionScope) -> Vec<Arc<ExtensionManifest>> {
        let catalog = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        catalog
            .order
            .iter()
            .filter(|(s, _)| *s == scope)
            .filter_map(|(_, id)| catalog.by_id.get(id).cloned())
            .collect()
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.catalog.read().unwrap_or_else(PoisonError::into_inner).by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Test-harness teardown only; production code
    /// registers at startup and never unregisters.
    pub fn clear(&self) {
        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        catalog.by_id.clear();
        catalog.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(id: &str, name: &str) -> ExtensionManifest {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "scope": "DATASOURCE",
            "schema": { "type": "object", "properties": {} },
            "drivers": [{ "id": format!("{}.default", id), "name": "Default" }]
        }))
        .unwrap()
    }

    #[test]
    fn register_and_get() {
        let registry = ExtensionRegistry::new();
        registry.register(manifest("postgresql", "PostgreSQL")).unwrap();

        let found = registry.get("postgresql").expect("registered extension is retrievable");
        assert_eq!(found.name, "PostgreSQL");
        assert!(registry.get("mysql").is_none());
    }

    #[test]
    fn reregistration_replaces_the_whole_entry() {
        let registry = ExtensionRegistry::new();
        registry.register(manifest("postgresql", "PostgreSQL")).unwrap();

        let mut second = manifest("postgresql", "PostgreSQL 2");
        second.description = Some("updated".into());
        second.drivers.clear();
        registry.register(second.clone()).unwrap();

        // No field merging: the second manifest is returned exactly.
        let found = registry.get("postgresql").unwrap();
        assert_eq!(*found, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalid_manifest_leaves_prior_state_intact() {
        let registry = ExtensionRegistry::new();
        registry.register(manifest("postgresql", "PostgreSQL")).unwrap();

        let mut broken = manifest("postgresql", "PostgreSQL");
        broken.drivers.push(broken.drivers[0].clone()); // duplicate driver id
        assert!(registry.register(broken).is_err());

        let found = registry.get("postgresql").unwrap();
        assert_eq!(found.name, "PostgreSQL");
        assert_eq!(found.drivers.len(), 1);
    }

    #[test]
    fn list_is_ordered_by_first_registration() {
        let registry = ExtensionRegistry::new();
        registry.register(manifest("postgresql", "PostgreSQL")).unwrap();
        registry.register(manifest("sqlite", "SQLite")).unwrap();
        registry.register(manifest("bigquery", "BigQuery")).unwrap();

        // Re-registering does not move an extension to the tail.
        registry.register(manifest("postgresql", "PostgreSQL v2")).unwrap();

        let listed = registry.list(ExtensionScope::Datasource);
        let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["postgresql", "sqlite", "bigquery"]);
    }

    #[test]
    fn clear_resets_the_catalog() {
        let registry = ExtensionRegistry::new();
        registry.register(manifest("postgresql", "PostgreSQL")).unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.list(ExtensionScope::Datasource).is_empty());
    }

    #[test]
    fn concurrent_registration_is_consistent() {
        let registry = Arc::new(ExtensionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for round in 0..50 {
                        let m = manifest("contended", &format!("Name {}-{}", i, round));
                        registry.register(m).unwrap();
                        // Readers must always observe a whole manifest.
                        let seen = registry.get("contended").unwrap();
                        assert_eq!(seen.drivers.len(), 1);
                        assert!(seen.name.starts_with("Name "));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 1);
    }
}
