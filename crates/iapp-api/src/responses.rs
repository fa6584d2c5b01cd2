//! Response shapes returned by the device cluster

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Key under which the cluster reports its aggregate sync status
pub const SYNC_STATUS_ENTRY: &str = "https://localhost/mgmt/tm/cm/sync-status/0";

/// Status text reported once every device in the group has converged
pub const IN_SYNC: &str = "In Sync";

/// High-availability role of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailoverState {
    Active,
    Standby,
    #[default]
    #[serde(other)]
    Other,
}

/// A device entry from `/mgmt/tm/cm/device`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDevice {
    #[serde(default)]
    pub management_ip: Option<String>,
    #[serde(default)]
    pub failover_state: FailoverState,
    #[serde(default, deserialize_with = "flag")]
    pub self_device: bool,
}

/// Device list response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceList {
    #[serde(default)]
    pub items: Vec<ClusterDevice>,
}

impl DeviceList {
    /// The device answering the request
    #[must_use]
    pub fn self_device(&self) -> Option<&ClusterDevice> {
        self.items.iter().find(|d| d.self_device)
    }

    /// First device currently holding the active role
    #[must_use]
    pub fn active_device(&self) -> Option<&ClusterDevice> {
        self.items
            .iter()
            .find(|d| d.failover_state == FailoverState::Active)
    }
}

// The cluster reports `selfDevice` as the string "true"/"false".
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Text(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    })
}

/// Parsed convergence status of a sync group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub status: String,
    pub summary: String,
}

impl SyncStatus {
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.status == IN_SYNC
    }
}

/// Raw `/mgmt/tm/cm/sync-status` response
#[derive(Debug, Clone, Deserialize)]
pub struct SyncStatusResponse {
    #[serde(default)]
    entries: HashMap<String, StatusEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct StatusEntry {
    #[serde(rename = "nestedStats")]
    nested_stats: NestedStats,
}

#[derive(Debug, Clone, Deserialize)]
struct NestedStats {
    entries: StatusFields,
}

#[derive(Debug, Clone, Deserialize)]
struct StatusFields {
    status: Description,
    summary: Description,
}

#[derive(Debug, Clone, Deserialize)]
struct Description {
    description: String,
}

impl SyncStatusResponse {
    /// Extract status and summary text, if the aggregate entry is present
    #[must_use]
    pub fn status(&self) -> Option<SyncStatus> {
        self.entries.get(SYNC_STATUS_ENTRY).map(|entry| {
            let fields = &entry.nested_stats.entries;
            SyncStatus {
                status: fields.status.description.clone(),
                summary: fields.summary.description.clone(),
            }
        })
    }
}
