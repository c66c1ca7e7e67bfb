//! Configuration knobs for the synchronization pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Error returned when configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The workload selector label key is empty
    #[error("workload app label must not be empty")]
    EmptyWorkloadLabel,
    /// The config namespace is empty
    #[error("namespace must not be empty")]
    EmptyNamespace,
    /// The refresh interval is zero
    #[error("refresh interval must be greater than 0")]
    ZeroRefreshInterval,
}

/// Pipeline configuration.
///
/// # Example
/// ```
/// use sidecar_sync::SyncConfig;
/// use std::time::Duration;
///
/// let config: SyncConfig = serde_json::from_str(
///     r#"{"suppression_window": {"secs": 10, "nanos": 0}, "workload_app_label": "application"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.suppression_window, Duration::from_secs(10));
/// assert_eq!(config.namespace, "dubbo-system");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Cool-down window during which dependency removals are withheld
    pub suppression_window: Duration,
    /// Label key selecting an application's workloads
    pub workload_app_label: String,
    /// Namespace of generated config identities
    pub namespace: String,
    /// Control-plane revision stamped on generated configs
    pub revision: Option<String>,
    /// How often the refresh driver checks for changes
    pub refresh_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            suppression_window: Duration::from_secs(30),
            workload_app_label: "app".to_string(),
            namespace: "dubbo-system".to_string(),
            revision: None,
            refresh_interval: Duration::from_secs(1),
        }
    }
}

impl SyncConfig {
    /// Check the configuration for values the pipeline cannot work with.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workload_app_label.is_empty() {
            return Err(ConfigError::EmptyWorkloadLabel);
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SyncConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_label_rejected() {
        let config = SyncConfig {
            workload_app_label: String::new(),
            ..SyncConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyWorkloadLabel));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let config = SyncConfig {
            namespace: String::new(),
            ..SyncConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyNamespace));
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let config = SyncConfig {
            refresh_interval: Duration::ZERO,
            ..SyncConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroRefreshInterval));
        assert_eq!(
            ConfigError::ZeroRefreshInterval.to_string(),
            "refresh interval must be greater than 0"
        );
    }

    #[test]
    fn test_zero_window_allowed() {
        let config = SyncConfig {
            suppression_window: Duration::ZERO,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_through_yaml() {
        let config = SyncConfig {
            revision: Some("canary".to_string()),
            ..SyncConfig::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: SyncConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
