//! Extension registry and driver resolution.
//!
//! Extensions announce themselves through manifests ([`crate::domain::extension`]),
//! the [`ExtensionRegistry`] catalogs them for the life of the process, and
//! the [`DriverResolver`] turns a `(extension, driver, runtime)` triple into
//! loadable driver code: a host module specifier for co-located drivers, a
//! fetched-and-normalized bundle for sandboxed ones.

pub mod loader;
pub mod registry;
pub mod resolver;

pub use loader::{
    driver_url, DriverExport, DriverLoader, DriverModule, HttpDriverLoader, DEFAULT_DRIVER_ENTRY,
    EXTENSIONS_PATH, FACTORY_EXPORT,
};
pub use registry::ExtensionRegistry;
pub use resolver::{DriverHandle, DriverResolver};
