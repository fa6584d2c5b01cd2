//! Create/poll/delete state machine for one iApp service

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use iapp_api::{OperationEvent, ServiceTemplate};
use iapp_client::{ClientError, RemoteOutcome, ServiceApi};

use crate::error::OperationError;
use crate::sync::ClusterSync;

/// Result of one invocation of a service operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// The operation finished
    Completed,
    /// The service is not ready; the host should invoke the operation again
    /// after `retry_after` with a higher attempt number
    Deferred {
        retry_after: Duration,
        message: String,
    },
}

impl OperationOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, OperationOutcome::Completed)
    }
}

/// Lifecycle operations for one service, invoked by a host engine
///
/// Holds no state between invocations: the host supplies the attempt number
/// and owns the timing of re-invocation.
pub struct ServiceOperation {
    service: Arc<dyn ServiceApi>,
    retry_interval: Duration,
    events: Option<broadcast::Sender<OperationEvent>>,
}

impl ServiceOperation {
    /// Create an operation over `service`, deferring by `retry_interval`
    /// while the service is still being deployed
    pub fn new(service: Arc<dyn ServiceApi>, retry_interval: Duration) -> Self {
        Self {
            service,
            retry_interval,
            events: None,
        }
    }

    /// Publish lifecycle events on `tx`
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

    fn service_name(&self) -> &str {
        &self.service.identity().service_name
    }

    /// Run one invocation of the create operation
    ///
    /// On attempt 0 the creation request is submitted; later attempts only
    /// poll. A service that does not exist yet yields
    /// [`OperationOutcome::Deferred`]. Once it exists, `cluster` is synced
    /// before the operation completes.
    ///
    /// # Errors
    /// Returns `Validation` for missing names, `Create` or `Poll` for rejected
    /// or failed requests, and any error from the cluster sync.
    #[instrument(skip(self, template, cluster), fields(service = %self.service_name(), template = %template.template_name))]
    pub async fn create(
        &self,
        attempt: u32,
        template: &ServiceTemplate,
        cluster: &ClusterSync,
    ) -> Result<OperationOutcome, OperationError> {
        template.validate()?;
        self.service.identity().validate()?;

        if attempt == 0 {
            self.request_creation(template).await?;
        } else {
            debug!(attempt, "creation already requested, polling only");
        }

        match self.service.poll().await {
            RemoteOutcome::Ok => {
                info!("service {} has been created", self.service_name());
                self.emit(OperationEvent::ServiceCreated {
                    service: self.service_name().to_string(),
                });
            }
            RemoteOutcome::NotFound(details) => {
                let message = format!(
                    "Service {} is not created yet. Response details: {details}",
                    self.service_name()
                );
                info!(attempt, retry_after = ?self.retry_interval, "{message}");
                self.emit(OperationEvent::ServicePending {
                    service: self.service_name().to_string(),
                    attempt,
                    retry_after_secs: self.retry_interval.as_secs(),
                    message: message.clone(),
                });
                return Ok(OperationOutcome::Deferred {
                    retry_after: self.retry_interval,
                    message,
                });
            }
            RemoteOutcome::Failed(source) => {
                return Err(OperationError::Poll {
                    service: self.service_name().to_string(),
                    source,
                });
            }
        }

        cluster.run().await?;

        Ok(OperationOutcome::Completed)
    }

    async fn request_creation(&self, template: &ServiceTemplate) -> Result<(), OperationError> {
        let failed = |source| OperationError::Create {
            service: self.service_name().to_string(),
            template: template.template_name.clone(),
            source,
        };

        match self.service.create(template).await {
            RemoteOutcome::Ok => {
                info!("service {} has been requested", self.service_name());
                self.emit(OperationEvent::ServiceRequested {
                    service: self.service_name().to_string(),
                    template: template.template_name.clone(),
                });
                Ok(())
            }
            RemoteOutcome::NotFound(message) => Err(failed(ClientError::Remote(message))),
            RemoteOutcome::Failed(source) => Err(failed(source)),
        }
    }

    /// Delete the service
    ///
    /// # Errors
    /// Returns `Validation` for missing names and `Delete` if the request fails.
    #[instrument(skip(self), fields(service = %self.service_name()))]
    pub async fn delete(&self) -> Result<(), OperationError> {
        self.service.identity().validate()?;

        self.service
            .delete()
            .await
            .into_result()
            .map_err(|source| OperationError::Delete {
                service: self.service_name().to_string(),
                source,
            })?;

        info!("service {} has been deleted", self.service_name());
        self.emit(OperationEvent::ServiceDeleted {
            service: self.service_name().to_string(),
        });
        Ok(())
    }
}
