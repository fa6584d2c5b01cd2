//! iapp-api: Shared wire and domain types
//!
//! Contains the service identity and connection parameters, the iApp service
//! creation payload, the device-cluster response shapes, and the structured
//! operation events shared by the client, core, and CLI crates.

pub mod events;
pub mod params;
pub mod requests;
pub mod responses;

pub use events::OperationEvent;
pub use params::{ConnectionParams, MissingParam, Protocol, ServiceIdentity, ServiceTemplate};
pub use requests::{ClusterCommand, CreationRequest, CreationRequestBuilder, Link};
pub use responses::{ClusterDevice, DeviceList, FailoverState, SyncStatus, SyncStatusResponse};
