//! Configuration types for operations and cluster sync

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Device cluster to sync once a service is created
#[derive(Clone, Serialize, Deserialize)]
pub struct ClusterTarget {
    /// Management address of the device to start from
    pub ip: String,
    /// Device group to push configuration to
    pub sync_group: String,
    /// Basic auth user
    pub user: String,
    /// Basic auth password
    pub password: String,
}

impl fmt::Debug for ClusterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterTarget")
            .field("ip", &self.ip)
            .field("sync_group", &self.sync_group)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Retry settings shared by service polling and sync-status polling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Seconds between polls
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Cap on sync-status checks (unbounded when unset)
    #[serde(default)]
    pub max_sync_checks: Option<u32>,
}

fn default_interval_secs() -> u64 {
    10
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_sync_checks: None,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            retry_interval: self.interval(),
            max_attempts: self.max_sync_checks,
        }
    }
}

/// How the sync-status loop waits between checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Wait between status checks
    pub retry_interval: Duration,
    /// Maximum number of status checks; `None` polls until converged
    pub max_attempts: Option<u32>,
}

impl SyncPolicy {
    #[must_use]
    pub fn unbounded(retry_interval: Duration) -> Self {
        Self {
            retry_interval,
            max_attempts: None,
        }
    }
}
