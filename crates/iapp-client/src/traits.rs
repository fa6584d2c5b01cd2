//! Seams between the operation state machine and the remote APIs

use async_trait::async_trait;
use iapp_api::{DeviceList, ServiceIdentity, ServiceTemplate, SyncStatus};

use crate::error::Result;
use crate::outcome::RemoteOutcome;

/// Lifecycle calls against one iApp service on the appliance
#[async_trait]
pub trait ServiceApi: Send + Sync {
    /// Service this client is bound to
    fn identity(&self) -> &ServiceIdentity;

    /// Submit a creation request built from `template`
    async fn create(&self, template: &ServiceTemplate) -> RemoteOutcome;

    /// Check whether the service has finished deploying
    async fn poll(&self) -> RemoteOutcome;

    /// Remove the service
    async fn delete(&self) -> RemoteOutcome;
}

/// Calls against a device in a config-sync cluster
///
/// `ip` is the management address (optionally `host:port`) of the device to talk to.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn devices(&self, ip: &str) -> Result<DeviceList>;
    async fn save_config(&self, ip: &str) -> Result<()>;
    async fn sync_to_group(&self, ip: &str, group: &str) -> Result<()>;
    async fn sync_status(&self, ip: &str) -> Result<SyncStatus>;
}
