//! Host-side scheduling of deferred operations

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use iapp_api::{OperationEvent, ServiceTemplate};
use iapp_core::{
    ClusterSync, ClusterTarget, OperationError, OperationOutcome, ServiceOperation, SyncPolicy,
};

/// Re-invoke the create operation until it completes or fails
///
/// Each deferral is honoured by waiting the requested delay and invoking the
/// operation again with the next attempt number. `max_attempts` bounds the
/// number of invocations; `None` keeps going until the operation settles.
/// Returns the number of invocations made.
pub async fn run_create(
    operation: &ServiceOperation,
    template: &ServiceTemplate,
    cluster: &ClusterSync,
    first_attempt: u32,
    max_attempts: Option<u32>,
) -> eyre::Result<u32> {
    let mut attempt = first_attempt;
    let mut made = 0u32;
    loop {
        made = made.saturating_add(1);
        match operation.create(attempt, template, cluster).await {
            Ok(OperationOutcome::Completed) => return Ok(made),
            Ok(OperationOutcome::Deferred {
                retry_after,
                message,
            }) => {
                if max_attempts.is_some_and(|max| made >= max) {
                    eyre::bail!("gave up after {made} attempts: {message}");
                }
                info!(attempt, retry_after = ?retry_after, "{message}");
                sleep(retry_after).await;
                attempt = attempt.saturating_add(1);
            }
            Err(e) => return Err(report(e)),
        }
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Build the cluster sync a create must run once the service exists
///
/// # Errors
/// Returns error if no `[bigip]` section is configured or the session cannot
/// be opened.
pub fn cluster_for_create(
    target: Option<&ClusterTarget>,
    policy: SyncPolicy,
) -> eyre::Result<ClusterSync> {
    let Some(target) = target else {
        eyre::bail!("create requires a [bigip] section naming the device group to sync");
    };
    ClusterSync::connect(target, policy).map_err(report)
}

/// Turn a fatal operation error into an operator-facing report
pub fn report(error: OperationError) -> eyre::Report {
    if error.is_validation() {
        warn!(error = %error, "invalid node properties");
    }
    eyre::Report::new(error)
}

/// Forward operation events to the log as JSON
pub fn log_events(mut rx: broadcast::Receiver<OperationEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(event = %json, subject = %event.subject(), "operation event"),
                    Err(e) => warn!(error = %e, "failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
