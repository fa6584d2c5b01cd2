//! Fatal operation errors reported to the host engine

use thiserror::Error;

use iapp_api::MissingParam;
use iapp_client::ClientError;

/// Non-recoverable failure of a service operation
///
/// The display text is the operator-facing message; the client error, when
/// there is one, is chained as the source.
#[derive(Error, Debug)]
pub enum OperationError {
    /// A required node property was missing
    #[error(transparent)]
    Validation(#[from] MissingParam),

    /// The creation request was rejected or could not be sent
    #[error("Failed creating service '{service}' for template '{template}'")]
    Create {
        service: String,
        template: String,
        #[source]
        source: ClientError,
    },

    /// Polling reported a failed deployment or an unexpected response
    #[error("Failed creating service '{service}'")]
    Poll {
        service: String,
        #[source]
        source: ClientError,
    },

    /// The delete request was rejected or could not be sent
    #[error("Failed deleting service '{service}'")]
    Delete {
        service: String,
        #[source]
        source: ClientError,
    },

    /// No active device could be determined from the device list
    #[error("Cannot find an active device")]
    NoActiveDevice {
        /// Device the list was requested from
        ip: String,
    },

    /// A cluster call failed during save, sync, or status polling
    #[error("Failed syncing device group '{group}' on {ip}")]
    Sync {
        group: String,
        ip: String,
        #[source]
        source: ClientError,
    },

    /// The status loop hit its configured cap before convergence
    #[error("Device group '{group}' did not converge after {attempts} status checks")]
    NotConverged { group: String, attempts: u32 },
}

impl OperationError {
    /// Check if the error comes from missing input rather than a remote call
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, OperationError::Validation(_))
    }

    /// Underlying client error, if any
    #[must_use]
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            OperationError::Create { source, .. }
            | OperationError::Poll { source, .. }
            | OperationError::Delete { source, .. }
            | OperationError::Sync { source, .. } => Some(source),
            _ => None,
        }
    }
}
