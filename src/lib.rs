//! # Sourceplane
//!
//! Sourceplane is the datasource extension and driver resolution core of
//! the workspace product: a plugin architecture through which the product
//! supports many external data sources (databases, files, APIs) via
//! self-describing extensions, each offering drivers that may execute in
//! different runtimes.
//!
//! ## Core Components
//!
//! - **Extension Registry**: in-memory catalog of validated extension
//!   manifests, keyed by id and scope
//! - **Driver Resolver**: turns `(extension, driver, runtime)` into a
//!   loadable driver handle, fetching and caching sandboxed bundles
//! - **Secret Vault**: the protect/reveal boundary guarding credentials
//!   embedded in datasource configuration
//! - **Datasource Repository**: CRUD over datasource records with secrets
//!   protected at rest
//!
//! UI rendering, agent orchestration, HTTP routing, and the desktop shell
//! are external collaborators; this crate only exposes the contracts they
//! consume.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sourceplane::{AppConfig, Result, Sourceplane};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     sourceplane::observability::init_tracing(&config.observability)?;
//!     let plane = Sourceplane::bootstrap(config).await?;
//!     plane.registry().register(load_manifest()?)?;
//!     Ok(())
//! }
//! # fn load_manifest() -> sourceplane::Result<sourceplane::domain::ExtensionManifest> { unimplemented!() }
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod extensions;
pub mod observability;
pub mod secrets;
pub mod storage;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Result, SourceplaneError};
pub use extensions::{DriverHandle, DriverResolver, ExtensionRegistry, HttpDriverLoader};
pub use secrets::SecretVault;
pub use storage::{DatasourceRepository, KvStore};

use crate::storage::SqliteStore;
use std::sync::Arc;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// The assembled core: registry, resolver, vault, and repository wired
/// together once at startup and shared for the life of the process.
pub struct Sourceplane {
    config: AppConfig,
    registry: Arc<ExtensionRegistry>,
    resolver: Arc<DriverResolver>,
    vault: Arc<SecretVault>,
    datasources: Arc<DatasourceRepository>,
}

impl Sourceplane {
    /// Wire the core over the embedded store named in the configuration
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        let store =
            SqliteStore::connect(&config.database.url, config.database.max_connections).await?;
        Self::with_store(config, Arc::new(store))
    }

    /// Wire the core over a caller-provided store (tests, ephemeral
    /// workspaces)
    pub fn with_store(config: AppConfig, store: Arc<dyn KvStore>) -> Result<Self> {
        let vault = Arc::new(SecretVault::from_config(&config.vault)?);
        let registry = Arc::new(ExtensionRegistry::new());
        let loader = Arc::new(HttpDriverLoader::with_timeout(config.resolver.fetch_timeout()));
        let resolver = Arc::new(DriverResolver::new(
            Arc::clone(&registry),
            loader,
            config.resolver.origin()?,
        ));
        let datasources = Arc::new(DatasourceRepository::new(
            store,
            Arc::clone(&registry),
            Arc::clone(&vault),
        ));

        tracing::info!(app_name = APP_NAME, version = VERSION, "Sourceplane core assembled");
        Ok(Self { config, registry, resolver, vault, datasources })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &Arc<DriverResolver> {
        &self.resolver
    }

    pub fn vault(&self) -> &Arc<SecretVault> {
        &self.vault
    }

    pub fn datasources(&self) -> &Arc<DatasourceRepository> {
        &self.datasources
    }
}
