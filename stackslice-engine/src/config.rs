//! Engine configuration.
//!
//! The worker bound is process-wide: tasks read [`global`] when they start
//! instead of taking it per call. Applications set it once at startup with
//! [`set_global`], typically from [`EngineConfig::from_env`] or a config file.

use std::sync::{OnceLock, PoisonError, RwLock};

use crate::error::{EngineError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Environment variable read by [`EngineConfig::from_env`].
pub const MAX_WORKERS_ENV: &str = "STACKSLICE_MAX_WORKERS";

/// Configuration for the slice engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Upper bound on worker threads per run (default: rayon's thread count).
    pub max_workers: usize,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: rayon::current_num_threads().max(1),
            thread_name_prefix: "stackslice-worker".to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `STACKSLICE_MAX_WORKERS` when set.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidConfig`] if the variable is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        match std::env::var(MAX_WORKERS_ENV) {
            Ok(raw) => {
                let workers = raw.trim().parse::<usize>().map_err(|e| {
                    EngineError::InvalidConfig(format!("{MAX_WORKERS_ENV}={raw:?}: {e}"))
                })?;
                let config = config.with_max_workers(workers);
                config.validate()?;
                Ok(config)
            }
            Err(_) => Ok(config),
        }
    }

    /// Sets the maximum worker count.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidConfig`] if `max_workers` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(EngineError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn global_cell() -> &'static RwLock<EngineConfig> {
    static GLOBAL: OnceLock<RwLock<EngineConfig>> = OnceLock::new();
    GLOBAL.get_or_init(|| RwLock::new(EngineConfig::default()))
}

/// Current process-wide configuration.
#[must_use]
pub fn global() -> EngineConfig {
    global_cell()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Replaces the process-wide configuration.
///
/// Runs already in progress keep the configuration they started with.
///
/// # Errors
/// Returns [`EngineError::InvalidConfig`] if the configuration is invalid.
pub fn set_global(config: EngineConfig) -> Result<()> {
    config.validate()?;
    log::debug!("engine config: max_workers={}", config.max_workers);
    *global_cell()
        .write()
        .unwrap_or_else(PoisonError::into_inner) = config;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::new();
        assert!(config.max_workers >= 1);
        assert!(config.validate().is_ok());
        assert_eq!(config.thread_name_prefix, "stackslice-worker");
    }

    #[test]
    fn test_builder_and_validation() {
        let config = EngineConfig::new()
            .with_max_workers(3)
            .with_thread_name_prefix("slice");
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.thread_name_prefix, "slice");
        assert!(config.with_max_workers(0).validate().is_err());
    }

    // The only test in this binary that touches the variable
    #[test]
    fn test_from_env_parses_max_workers() {
        std::env::set_var(MAX_WORKERS_ENV, " 5 ");
        assert_eq!(EngineConfig::from_env().unwrap().max_workers, 5);

        std::env::set_var(MAX_WORKERS_ENV, "0");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(EngineError::InvalidConfig(_))
        ));

        std::env::set_var(MAX_WORKERS_ENV, "many");
        let err = EngineConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(MAX_WORKERS_ENV), "{err}");

        std::env::remove_var(MAX_WORKERS_ENV);
        assert_eq!(EngineConfig::from_env().unwrap(), EngineConfig::new());
    }

    #[test]
    fn test_set_global_rejects_invalid() {
        assert!(set_global(EngineConfig::new().with_max_workers(0)).is_err());
        assert!(global().max_workers >= 1);
    }
}
