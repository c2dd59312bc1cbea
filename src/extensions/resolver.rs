//! Driver resolution: from (extension, driver, runtime) to loadable code.
//!
//! Resolution is a pure catalog walk until the runtime branch: co-located
//! drivers resolve to a host module specifier with no I/O, sandboxed
//! drivers are fetched from the extensions origin through the injected
//! [`DriverLoader`]. Results are cached per `(extension, driver)` key;
//! concurrent first-resolutions of the same key are coalesced into a
//! single fetch and every caller shares the one agreed-upon handle.

use crate::domain::DriverRuntime;
use crate::errors::{Result, SourceplaneError};
use crate::extensions::loader::{driver_url, DriverLoader, DriverModule};
use crate::extensions::registry::ExtensionRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

/// Loadable reference to a concrete driver implementation
#[derive(Debug, Clone)]
pub enum DriverHandle {
    /// Co-located driver, resolved through the host's normal
    /// module-loading mechanism with no network involved
    Host { specifier: String },
    /// Dynamically fetched sandboxed driver bundle
    Sandboxed(Arc<DriverModule>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DriverKey {
    extension_id: String,
    driver_id: String,
}

/// Resolves and caches driver handles for the whole process
#[derive(Debug)]
pub struct DriverResolver {
    registry: Arc<ExtensionRegistry>,
    loader: Arc<dyn DriverLoader>,
    origin: Url,
    cache: DashMap<DriverKey, Arc<OnceCell<DriverHandle>>>,
}

impl DriverResolver {
    pub fn new(registry: Arc<ExtensionRegistry>, loader: Arc<dyn DriverLoader>, origin: Url) -> Self {
        Self { registry, loader, origin, cache: DashMap::new() }
    }

    /// Resolve the driver `driver_id` of extension `extension_id` for a
    /// caller running in `caller_runtime`.
    ///
    /// A runtime mismatch fails before any load is attempted. Lookup
    /// failures and load failures are typed; a failed load leaves the cache
    /// slot empty so the caller may retry at its own discretion.
    #[instrument(skip(self), name = "resolve_driver")]
    pub async fn resolve(
        &self,
        extension_id: &str,
        driver_id: &str,
        caller_runtime: DriverRuntime,
    ) -> Result<DriverHandle> {
        let manifest = self
            .registry
            .get(extension_id)
            .ok_or_else(|| SourceplaneError::extension_not_found(extension_id))?;
        let descriptor = manifest
            .driver(driver_id)
            .ok_or_else(|| SourceplaneError::driver_not_found(extension_id, driver_id))?;

        let declared = descriptor.effective_runtime();
        if declared != caller_runtime {
            return Err(SourceplaneError::RuntimeMismatch {
                extension_id: extension_id.to_string(),
                driver_id: driver_id.to_string(),
                declared: declared.to_string(),
                requested: caller_runtime.to_string(),
            });
        }

        let key =
            DriverKey { extension_id: extension_id.to_string(), driver_id: driver_id.to_string() };
        let cell = {
            // Shard lock scope; must not be held across the fetch await.
            let entry = self.cache.entry(key).or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        let handle = cell
            .get_or_try_init(|| async {
                match declared {
                    DriverRuntime::Node => {
                        // Resolvable by the host module loader; nothing to fetch.
                        let specifier = format!("extensions/{}/{}", extension_id, driver_id);
                        debug!(specifier = %specifier, "Resolved co-located driver");
                        Ok::<DriverHandle, SourceplaneError>(DriverHandle::Host { specifier })
                    }
                    DriverRuntime::Browser => {
                        let url =
                            driver_url(&self.origin, extension_id, descriptor.entry.as_deref())?;
                        debug!(url = %url, "Fetching sandboxed driver bundle");
                        let module = self.loader.load(&url).await?;
                        Ok(DriverHandle::Sandboxed(Arc::new(module)))
                    }
                }
            })
            .await?;

        Ok(handle.clone())
    }

    /// Drop the cached handle for one driver (extension hot-reload)
    pub fn invalidate(&self, extension_id: &str, driver_id: &str) {
        self.cache.remove(&DriverKey {
            extension_id: extension_id.to_string(),
            driver_id: driver_id.to_string(),
        });
    }

    /// Drop every cached handle
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached driver handles
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
