//! iapp-client: appliance and device-cluster HTTP clients
//!
//! `ServiceClient` drives the iApp service lifecycle (create, poll, delete) on
//! the appliance and classifies every response into a [`RemoteOutcome`].
//! `ClusterSession` is the authenticated session used to save, sync, and watch
//! the convergence of a device cluster.
//!
//! # Example
//!
//! ```no_run
//! use iapp_api::{ConnectionParams, ServiceIdentity};
//! use iapp_client::{RemoteOutcome, ServiceApi, ServiceClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new(
//!     ServiceIdentity::new("tenant1", "service1"),
//!     ConnectionParams {
//!         ip: "10.0.0.10".into(),
//!         port: 443,
//!         user: "admin".into(),
//!         password: "admin".into(),
//!         use_ssl: true,
//!     },
//! )?;
//!
//! match client.poll().await {
//!     RemoteOutcome::Ok => println!("deployed"),
//!     RemoteOutcome::NotFound(message) => println!("pending: {message}"),
//!     RemoteOutcome::Failed(e) => println!("failed: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod error;
pub mod outcome;
pub mod service;
pub mod traits;

pub use cluster::ClusterSession;
pub use error::{ClientError, Result};
pub use outcome::RemoteOutcome;
pub use service::ServiceClient;
pub use traits::{ClusterApi, ServiceApi};
