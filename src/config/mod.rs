// ABOUTME: Runtime settings for podrecycle, assembled from command-line flags.
// ABOUTME: Validates values and supplies the defaults shared by CLI and tests.

use crate::coordinator::DEFAULT_MAX_CONCURRENT_DELETES;
use crate::error::{Error, Result};
use crate::runtime::RuntimeConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between full-list resyncs of the pod population.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of consecutive event stream resubscriptions.
pub const DEFAULT_EVENT_RECONNECTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Restrict the pod watch to one namespace. `None` watches all.
    pub namespace: Option<String>,

    /// Explicit kubeconfig path. `None` uses in-cluster or default loading.
    pub kubeconfig: Option<PathBuf>,

    pub runtime: RuntimeConfig,

    pub resync_interval: Duration,

    pub max_concurrent_deletes: usize,

    pub delete_timeout: Option<Duration>,

    pub event_reconnects: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: None,
            kubeconfig: None,
            runtime: RuntimeConfig::default(),
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            max_concurrent_deletes: DEFAULT_MAX_CONCURRENT_DELETES,
            delete_timeout: None,
            event_reconnects: DEFAULT_EVENT_RECONNECTS,
        }
    }
}

impl Settings {
    /// Reject values that would stall the pipeline.
    pub fn validate(self) -> Result<Self> {
        if self.resync_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "resync interval must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_deletes == 0 {
            return Err(Error::InvalidConfig(
                "max concurrent deletes must be at least 1".to_string(),
            ));
        }
        if self.delete_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidConfig(
                "delete timeout must be greater than zero".to_string(),
            ));
        }
        if self.namespace.as_deref().is_some_and(str::is_empty) {
            return Err(Error::InvalidConfig("namespace cannot be empty".to_string()));
        }
        Ok(self)
    }
}
