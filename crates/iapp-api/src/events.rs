//! Operation event types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationEvent {
    ServiceRequested {
        service: String,
        template: String,
    },
    ServicePending {
        service: String,
        attempt: u32,
        retry_after_secs: u64,
        message: String,
    },
    ServiceCreated {
        service: String,
    },
    ServiceDeleted {
        service: String,
    },
    SyncTargetSelected {
        requested: String,
        target: String,
    },
    /// First status check, or a check whose status differs from the previous one
    SyncStatusChanged {
        target: String,
        status: String,
        summary: String,
    },
    SyncCompleted {
        target: String,
        group: String,
    },
}

impl OperationEvent {
    /// Service or device the event concerns
    #[must_use]
    pub fn subject(&self) -> &str {
        match self {
            OperationEvent::ServiceRequested { service, .. }
            | OperationEvent::ServicePending { service, .. }
            | OperationEvent::ServiceCreated { service }
            | OperationEvent::ServiceDeleted { service } => service,
            OperationEvent::SyncTargetSelected { target, .. }
            | OperationEvent::SyncStatusChanged { target, .. }
            | OperationEvent::SyncCompleted { target, .. } => target,
        }
    }
}
