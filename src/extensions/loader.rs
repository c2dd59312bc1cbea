//! Driver bundle loading for the sandboxed runtime.
//!
//! Sandboxed drivers ship as ES module bundles served from the extensions
//! origin. The server never executes them; it fetches the bundle, checks
//! that it exposes the conventional factory surface, and hands the
//! normalized [`DriverModule`] to the sandbox host. [`DriverLoader`] is the
//! seam that keeps the resolver's algorithm and caching testable without
//! real network access.

use crate::errors::{Result, SourceplaneError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use url::Url;

/// Conventional bundle filename when a descriptor has no `entry`
pub const DEFAULT_DRIVER_ENTRY: &str = "driver.js";

/// Path segment under the origin where extension assets are served
pub const EXTENSIONS_PATH: &str = "extensions";

/// Name of the factory export a bundle may expose
pub const FACTORY_EXPORT: &str = "createDriver";

/// Default timeout for bundle fetches
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the conventional driver load URL:
/// `{origin}/extensions/{extension_id}/{entry}`.
pub fn driver_url(origin: &Url, extension_id: &str, entry: Option<&str>) -> Result<Url> {
    let entry = entry.unwrap_or(DEFAULT_DRIVER_ENTRY);
    origin.join(&format!("{}/{}/{}", EXTENSIONS_PATH, extension_id, entry)).map_err(|e| {
        SourceplaneError::validation(format!(
            "Cannot build driver URL for extension '{}': {}",
            extension_id, e
        ))
    })
}

/// Which factory surface a bundle exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExport {
    /// Named `createDriver` export
    Factory,
    /// Default export
    Default,
}

/// A fetched driver bundle, normalized to a single factory shape
#[derive(Debug, Clone)]
pub struct DriverModule {
    source_url: Url,
    source: String,
    export: DriverExport,
}

impl DriverModule {
    /// Normalize a fetched bundle.
    ///
    /// The bundle must expose either a named `createDriver` factory or a
    /// default export; the named factory wins when both are present. A
    /// bundle exposing neither fails with `DriverLoad` carrying the URL.
    pub fn from_source(source_url: Url, source: String) -> Result<Self> {
        static FACTORY: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"export\s+(?:async\s+)?(?:function|const|let|var)\s+createDriver\b|export\s*\{[^}]*\bcreateDriver\b[^}]*\}",
            )
            .expect("factory export pattern is statically well-formed")
        });
        static DEFAULT: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"export\s+default\b")
                .expect("default export pattern is statically well-formed")
        });

        let export = if FACTORY.is_match(&source) {
            DriverExport::Factory
        } else if DEFAULT.is_match(&source) {
            DriverExport::Default
        } else {
            return Err(SourceplaneError::driver_load(
                source_url.as_str(),
                format!("bundle exposes neither a '{}' export nor a default export", FACTORY_EXPORT),
            ));
        };

        Ok(Self { source_url, source, export })
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn export(&self) -> DriverExport {
        self.export
    }
}

/// Loader abstraction over the dynamic-fetch mechanism
#[async_trait]
pub trait DriverLoader: Send + Sync + std::fmt::Debug {
    /// Fetch and normalize the bundle at `url`.
    ///
    /// Potentially slow; the resolver caches results, so implementations do
    /// not need their own cache. Abandoning the returned future drops the
    /// in-flight request.
    async fn load(&self, url: &Url) -> Result<DriverModule>;
}

/// Production loader fetching bundles over HTTPS
#[derive(Debug, Clone)]
pub struct HttpDriverLoader {
    client: reqwest::Client,
}

impl HttpDriverLoader {
    pub fn new() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self { client }
    }
}

impl Default for HttpDriverLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverLoader for HttpDriverLoader {
    async fn load(&self, url: &Url) -> Result<DriverModule> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceplaneError::driver_load(url.as_str(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceplaneError::driver_load(url.as_str(), format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceplaneError::driver_load(url.as_str(), e.to_string()))?;

        DriverModule::from_source(url.clone(), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://workspace.example.com").unwrap()
    }

    #[test]
    fn url_follows_the_convention() {
        let url = driver_url(&origin(), "postgresql", Some("pg.js")).unwrap();
        assert_eq!(url.as_str(), "https://workspace.example.com/extensions/postgresql/pg.js");
    }

    #[test]
    fn url_entry_defaults_to_driver_js() {
        let url = driver_url(&origin(), "postgresql", None).unwrap();
        assert_eq!(url.as_str(), "https://workspace.example.com/extensions/postgresql/driver.js");
    }

    #[test]
    fn named_factory_export_is_detected() {
        for source in [
            "export function createDriver(config) { return connect(config); }",
            "export async function createDriver(config) {}",
            "export const createDriver = (config) => connect(config);",
            "const createDriver = () => {};\nexport { createDriver };",
        ] {
            let module = DriverModule::from_source(origin(), source.to_string()).unwrap();
            assert_eq!(module.export(), DriverExport::Factory, "missed in: {}", source);
        }
    }

    #[test]
    fn default_export_is_detected() {
        let module = DriverModule::from_source(
            origin(),
            "export default { connect(config) { return null; } }".to_string(),
        )
        .unwrap();
        assert_eq!(module.export(), DriverExport::Default);
    }

    #[test]
    fn named_factory_wins_over_default() {
        let source = "export default helpers;\nexport function createDriver(c) {}";
        let module = DriverModule::from_source(origin(), source.to_string()).unwrap();
        assert_eq!(module.export(), DriverExport::Factory);
    }

    #[test]
    fn bundle_without_factory_surface_is_rejected() {
        let url = driver_url(&origin(), "postgresql", None).unwrap();
        let err =
            DriverModule::from_source(url.clone(), "const x = 1;".to_string()).unwrap_err();
        assert_eq!(err.kind(), "driver_load");
        assert!(err.to_string().contains(url.as_str()));
    }
}
