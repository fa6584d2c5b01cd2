//! Authenticated session against a device-cluster management API

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use iapp_api::{ClusterCommand, DeviceList, Protocol, SyncStatus, SyncStatusResponse};

use crate::error::{ClientError, Result};
use crate::service::build_http_client;
use crate::traits::ClusterApi;

const CONFIG_ENDPOINT: &str = "/mgmt/tm/sys/config";
const DEVICE_ENDPOINT: &str = "/mgmt/tm/cm/device";
const STATUS_ENDPOINT: &str = "/mgmt/tm/cm/sync-status";

/// Basic-auth session shared by every call of one cluster sync
///
/// Holds no per-device state, so the same session can address whichever
/// device ends up being the active one.
#[derive(Clone)]
pub struct ClusterSession {
    client: Client,
    protocol: Protocol,
    user: String,
    password: String,
}

impl ClusterSession {
    /// Open a session with the given credentials
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_http_client()?,
            protocol: Protocol::Https,
            user: user.into(),
            password: password.into(),
        })
    }

    /// Override the scheme used to reach devices (`https` by default)
    #[must_use]
    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    fn url(&self, ip: &str, endpoint: &str) -> String {
        format!("{}://{ip}{endpoint}", self.protocol)
    }

    async fn get(&self, ip: &str, endpoint: &str) -> Result<Response> {
        let url = self.url(ip, endpoint);
        debug!(url = %url, "cluster GET");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        check(response)
    }

    async fn post(&self, ip: &str, endpoint: &str, body: &impl Serialize) -> Result<Response> {
        let url = self.url(ip, endpoint);
        debug!(url = %url, "cluster POST");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.user, Some(&self.password))
            .json(body)
            .send()
            .await?;
        check(response)
    }
}

/// Decode a JSON body, reporting malformed payloads as `ClientError::Json`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn check(response: Response) -> Result<Response> {
    if response.status() != StatusCode::OK {
        return Err(ClientError::UnexpectedStatus {
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

impl fmt::Debug for ClusterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSession")
            .field("protocol", &self.protocol)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ClusterApi for ClusterSession {
    #[instrument(skip(self), level = "debug")]
    async fn devices(&self, ip: &str) -> Result<DeviceList> {
        decode(self.get(ip, DEVICE_ENDPOINT).await?).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn save_config(&self, ip: &str) -> Result<()> {
        self.post(ip, CONFIG_ENDPOINT, &ClusterCommand::save())
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn sync_to_group(&self, ip: &str, group: &str) -> Result<()> {
        self.post(ip, CONFIG_ENDPOINT, &ClusterCommand::sync_to_group(group))
            .await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn sync_status(&self, ip: &str) -> Result<SyncStatus> {
        let response: SyncStatusResponse = decode(self.get(ip, STATUS_ENDPOINT).await?).await?;
        response
            .status()
            .ok_or_else(|| ClientError::InvalidResponse("sync status entry missing".to_string()))
    }
}
