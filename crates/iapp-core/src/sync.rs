//! Cluster config sync: save, sync to group, and wait for convergence

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use iapp_api::{DeviceList, FailoverState, OperationEvent};
use iapp_client::{ClientError, ClusterApi, ClusterSession};

use crate::config::{ClusterTarget, SyncPolicy};
use crate::error::OperationError;

/// Pick the device that should receive save and sync commands
///
/// Returns `current_ip` unless the self device is standby, in which case the
/// active device's management address is used. `None` means no self device
/// was reported, or the self device is standby and no active peer is known.
#[must_use]
pub fn determine_active_device(current_ip: &str, devices: &DeviceList) -> Option<String> {
    let me = devices.self_device()?;
    if me.failover_state != FailoverState::Standby {
        return Some(current_ip.to_string());
    }

    warn!(ip = %current_ip, "device is standby unit");
    devices
        .active_device()
        .and_then(|d| d.management_ip.clone())
}

/// Drives one config sync of a device group
pub struct ClusterSync {
    session: Arc<dyn ClusterApi>,
    ip: String,
    group: String,
    policy: SyncPolicy,
    events: Option<broadcast::Sender<OperationEvent>>,
}

impl ClusterSync {
    /// Sync `group` starting from the device at `ip`, over an existing session
    pub fn new(
        session: Arc<dyn ClusterApi>,
        ip: impl Into<String>,
        group: impl Into<String>,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            session,
            ip: ip.into(),
            group: group.into(),
            policy,
            events: None,
        }
    }

    /// Open a fresh session for `target`
    ///
    /// # Errors
    /// Returns `OperationError::Sync` if the HTTP session cannot be created.
    pub fn connect(target: &ClusterTarget, policy: SyncPolicy) -> Result<Self, OperationError> {
        let session = ClusterSession::new(&target.user, &target.password).map_err(|source| {
            OperationError::Sync {
                group: target.sync_group.clone(),
                ip: target.ip.clone(),
                source,
            }
        })?;
        Ok(Self::new(
            Arc::new(session),
            &target.ip,
            &target.sync_group,
            policy,
        ))
    }

    /// Publish progress events on `tx`
    #[must_use]
    pub fn with_events(mut self, tx: broadcast::Sender<OperationEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: OperationEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn sync_error(&self, ip: &str, source: ClientError) -> OperationError {
        OperationError::Sync {
            group: self.group.clone(),
            ip: ip.to_string(),
            source,
        }
    }

    /// Save and sync the group, then wait until it reports "In Sync"
    ///
    /// The wait happens inside this call: the future does not resolve until the
    /// group converges, a call fails, or the policy's cap is reached.
    ///
    /// # Errors
    /// Returns `NoActiveDevice` if no target can be chosen, `Sync` if any
    /// cluster call fails, and `NotConverged` if the cap is reached.
    #[instrument(skip(self), fields(ip = %self.ip, group = %self.group))]
    pub async fn run(&self) -> Result<(), OperationError> {
        let target = self.select_target().await?;

        self.session
            .save_config(&target)
            .await
            .map_err(|e| self.sync_error(&target, e))?;
        info!(target = %target, "configuration saved");

        self.session
            .sync_to_group(&target, &self.group)
            .await
            .map_err(|e| self.sync_error(&target, e))?;
        info!(target = %target, group = %self.group, "config sync requested");

        self.await_convergence(&target).await?;

        self.emit(OperationEvent::SyncCompleted {
            target,
            group: self.group.clone(),
        });
        Ok(())
    }

    async fn select_target(&self) -> Result<String, OperationError> {
        let devices = self
            .session
            .devices(&self.ip)
            .await
            .map_err(|e| self.sync_error(&self.ip, e))?;

        let target = determine_active_device(&self.ip, &devices).ok_or_else(|| {
            OperationError::NoActiveDevice {
                ip: self.ip.clone(),
            }
        })?;

        self.emit(OperationEvent::SyncTargetSelected {
            requested: self.ip.clone(),
            target: target.clone(),
        });
        Ok(target)
    }

    async fn await_convergence(&self, target: &str) -> Result<(), OperationError> {
        let mut checks = 0u32;
        let mut last: Option<String> = None;
        loop {
            let status = self
                .session
                .sync_status(target)
                .await
                .map_err(|e| self.sync_error(target, e))?;
            checks += 1;

            info!(status = %status.status, summary = %status.summary, "sync status");
            if last.as_deref() != Some(status.status.as_str()) {
                self.emit(OperationEvent::SyncStatusChanged {
                    target: target.to_string(),
                    status: status.status.clone(),
                    summary: status.summary.clone(),
                });
                last = Some(status.status.clone());
            }

            if status.is_in_sync() {
                return Ok(());
            }

            if self.policy.max_attempts.is_some_and(|max| checks >= max) {
                return Err(OperationError::NotConverged {
                    group: self.group.clone(),
                    attempts: checks,
                });
            }

            info!(retry_in = ?self.policy.retry_interval, "group not in sync yet");
            tokio::time::sleep(self.policy.retry_interval).await;
        }
    }
}
