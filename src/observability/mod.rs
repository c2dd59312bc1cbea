//! # Observability Infrastructure
//!
//! Structured logging setup for the sourceplane core using the tracing
//! ecosystem. Repository and resolver operations are `#[instrument]`ed at
//! their definition sites; this module only installs the subscriber.

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over the configured default filter. If a subscriber is
/// already installed (test harness, embedding application) this is a no-op
/// rather than an error, so it is safe to call from multiple entry points.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let installed = if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if installed.is_ok() {
        tracing::info!(
            service_name = %config.service_name,
            log_level = %config.log_level,
            json_logs = config.json_logs,
            "Logging initialized"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let config = ObservabilityConfig::default();
        init_tracing(&config).unwrap();
        init_tracing(&config).unwrap();
    }
}
