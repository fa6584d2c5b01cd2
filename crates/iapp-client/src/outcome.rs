//! Classified result of an appliance call

use crate::error::ClientError;

/// Outcome of a create, poll, or delete call after status and body inspection
#[derive(Debug)]
pub enum RemoteOutcome {
    /// The call succeeded
    Ok,
    /// The service does not exist (yet), with the remote message
    NotFound(String),
    /// The call failed, remotely or in transport
    Failed(ClientError),
}

impl RemoteOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, RemoteOutcome::Ok)
    }

    /// Collapse into a `Result`, treating `NotFound` as a remote error
    ///
    /// # Errors
    /// Returns the failure, or a `Remote` error carrying the not-found message.
    pub fn into_result(self) -> Result<(), ClientError> {
        match self {
            RemoteOutcome::Ok => Ok(()),
            RemoteOutcome::NotFound(message) => Err(ClientError::Remote(message)),
            RemoteOutcome::Failed(e) => Err(e),
        }
    }
}

impl From<ClientError> for RemoteOutcome {
    fn from(e: ClientError) -> Self {
        RemoteOutcome::Failed(e)
    }
}
