//! # Error Handling
//!
//! Error types for the sourceplane core, defined with `thiserror`.
//!
//! Every failure surfaced by the registry, resolver, vault, or repository is
//! one of these variants, carrying the ids and context the surrounding UI or
//! CLI needs to render a stable message. Callers match on the variant (or on
//! [`SourceplaneError::kind`]) rather than parsing message strings.

/// Custom result type for sourceplane operations
pub type Result<T> = std::result::Result<T, SourceplaneError>;

/// Main error type for the sourceplane core
#[derive(thiserror::Error, Debug)]
pub enum SourceplaneError {
    /// A persisted entity is absent
    #[error("{resource} with ID '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// The requested extension is not in the registry
    #[error("Extension '{extension_id}' is not registered")]
    ExtensionNotFound { extension_id: String },

    /// The extension exists but does not offer the requested driver
    #[error("Driver '{driver_id}' not found in extension '{extension_id}'")]
    DriverNotFound { extension_id: String, driver_id: String },

    /// The driver's declared runtime does not match the caller's runtime
    #[error(
        "Driver '{driver_id}' of extension '{extension_id}' targets the '{declared}' \
         runtime but was requested from '{requested}'"
    )]
    RuntimeMismatch {
        extension_id: String,
        driver_id: String,
        declared: String,
        requested: String,
    },

    /// Fetching or normalizing a driver bundle failed
    #[error("Failed to load driver from '{url}': {message}")]
    DriverLoad { url: String, message: String },

    /// A reveal was attempted on a value that is not in protected form
    #[error("Value is not a protected secret")]
    NotProtected { field: Option<String> },

    /// A protected value was recognized but could not be revealed
    #[error("Protected value could not be revealed: {message}")]
    SecretCorrupted { message: String },

    /// A manifest or configuration failed its structural schema
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SourceplaneError {
    /// Create a not found error
    pub fn not_found<I: Into<String>>(resource: &'static str, id: I) -> Self {
        Self::NotFound { resource, id: id.into() }
    }

    /// Create an extension not found error
    pub fn extension_not_found<S: Into<String>>(extension_id: S) -> Self {
        Self::ExtensionNotFound { extension_id: extension_id.into() }
    }

    /// Create a driver not found error
    pub fn driver_not_found<E: Into<String>, D: Into<String>>(
        extension_id: E,
        driver_id: D,
    ) -> Self {
        Self::DriverNotFound { extension_id: extension_id.into(), driver_id: driver_id.into() }
    }

    /// Create a driver load error carrying the attempted URL
    pub fn driver_load<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::DriverLoad { url: url.into(), message: message.into() }
    }

    /// Create a not-protected error
    pub fn not_protected() -> Self {
        Self::NotProtected { field: None }
    }

    /// Create a not-protected error naming the config field
    pub fn not_protected_field<F: Into<String>>(field: F) -> Self {
        Self::NotProtected { field: Some(field.into()) }
    }

    /// Create a secret corrupted error
    pub fn secret_corrupted<M: Into<String>>(message: M) -> Self {
        Self::SecretCorrupted { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable discriminant for UI/CLI rendering and structured logs.
    ///
    /// Unlike the Display output, these strings never change across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceplaneError::NotFound { .. } => "not_found",
            SourceplaneError::ExtensionNotFound { .. } => "extension_not_found",
            SourceplaneError::DriverNotFound { .. } => "driver_not_found",
            SourceplaneError::RuntimeMismatch { .. } => "runtime_mismatch",
            SourceplaneError::DriverLoad { .. } => "driver_load",
            SourceplaneError::NotProtected { .. } => "not_protected",
            SourceplaneError::SecretCorrupted { .. } => "secret_corrupted",
            SourceplaneError::Validation { .. } => "validation",
            SourceplaneError::Database { .. } => "database",
            SourceplaneError::Serialization { .. } => "serialization",
            SourceplaneError::Config { .. } => "config",
            SourceplaneError::Internal { .. } => "internal",
        }
    }

    /// Check if this error should be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceplaneError::Database { .. } | SourceplaneError::DriverLoad { .. })
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for SourceplaneError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<serde_json::Error> for SourceplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for SourceplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config(format!("Configuration loading failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for SourceplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
