//! iapp-core: service lifecycle operations and cluster config sync
//!
//! `ServiceOperation` is the per-invocation state machine run by a host engine:
//! it submits the creation request once, polls for readiness, and returns
//! [`OperationOutcome::Deferred`] when the host should re-invoke it later.
//! Once the service exists, `ClusterSync` saves and syncs the device cluster
//! and waits for it to converge.

pub mod config;
pub mod error;
pub mod operation;
pub mod sync;

pub use config::{ClusterTarget, RetryConfig, SyncPolicy};
pub use error::OperationError;
pub use operation::{OperationOutcome, ServiceOperation};
pub use sync::{ClusterSync, determine_active_device};
