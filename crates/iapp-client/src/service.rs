//! Appliance client for iApp service lifecycle calls

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument};
use url::Url;

use iapp_api::{ConnectionParams, CreationRequest, ServiceIdentity, ServiceTemplate};

use crate::error::{ClientError, NO_ERROR_MESSAGE, Result};
use crate::outcome::RemoteOutcome;
use crate::traits::ServiceApi;

const SERVICE_ENDPOINT: &str = "/mgmt/cm/cloud/tenants/{tenant}/services/iapp/";

/// Build the HTTP client shared by appliance and cluster calls
///
/// TLS certificates are not verified.
pub(crate) fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok(Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .build()?)
}

/// Client for one iApp service on the appliance
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    identity: ServiceIdentity,
    connection: ConnectionParams,
    base_url: Url,
}

impl ServiceClient {
    /// Create a client for `identity` on the appliance described by `connection`
    ///
    /// # Errors
    /// Returns an error if the service URL cannot be built or the HTTP client
    /// cannot be initialised.
    pub fn new(identity: ServiceIdentity, connection: ConnectionParams) -> Result<Self> {
        Self::with_client(identity, connection, build_http_client()?)
    }

    /// Create a client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the service URL cannot be built.
    pub fn with_client(
        identity: ServiceIdentity,
        connection: ConnectionParams,
        client: Client,
    ) -> Result<Self> {
        let endpoint = SERVICE_ENDPOINT.replace("{tenant}", &identity.tenant_name);
        let base_url = Url::parse(&format!(
            "{}://{}:{}{endpoint}",
            connection.protocol(),
            connection.ip,
            connection.port
        ))?;

        Ok(Self {
            client,
            identity,
            connection,
            base_url,
        })
    }

    /// Collection URL services are created under
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of this service
    ///
    /// The service name is appended as a single percent-encoded path segment,
    /// so it always addresses an item of the collection.
    ///
    /// # Errors
    /// Returns an error if the base URL cannot carry path segments.
    pub fn item_url(&self) -> Result<Url> {
        let mut item = self.base_url.clone();
        item.path_segments_mut()
            .map_err(|()| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(&self.identity.service_name);
        Ok(item)
    }

    fn payload(&self, template: &ServiceTemplate) -> CreationRequest {
        CreationRequest::builder(
            &self.identity.tenant_name,
            &self.identity.service_name,
            &template.template_name,
        )
        .vars(template.vars.clone())
        .tables(template.tables.clone())
        .properties(template.properties.clone())
        .reference(
            self.connection.protocol(),
            &template.reference_hostname,
            self.connection.port,
        )
        .build()
    }

    async fn send_create(&self, payload: &CreationRequest) -> Result<Response> {
        let url = self.base_url.clone();
        debug!(url = %url, payload = ?payload, "sending create request");
        Ok(self
            .client
            .post(url)
            .basic_auth(&self.connection.user, Some(&self.connection.password))
            .json(payload)
            .send()
            .await?)
    }

    async fn send_get(&self) -> Result<Response> {
        let url = self.item_url()?;
        debug!(url = %url, "sending poll request");
        Ok(self
            .client
            .get(url)
            .basic_auth(&self.connection.user, Some(&self.connection.password))
            .send()
            .await?)
    }

    async fn send_delete(&self) -> Result<Response> {
        let url = self.item_url()?;
        debug!(url = %url, "sending delete request");
        Ok(self
            .client
            .delete(url)
            .basic_auth(&self.connection.user, Some(&self.connection.password))
            .send()
            .await?)
    }
}

/// Read the body as JSON, or `None` if it is empty or not JSON
async fn json_body(response: Response) -> Option<Value> {
    match response.text().await {
        Ok(text) => serde_json::from_str(&text).ok(),
        Err(e) => {
            debug!(error = %e, "failed to read response body");
            None
        }
    }
}

/// Pull a message out of `body[key]`, falling back to a placeholder
fn error_message(body: Option<&Value>, key: &str) -> String {
    match body.and_then(|b| b.get(key)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => {
            debug!(key, "no {key} key in the response");
            NO_ERROR_MESSAGE.to_string()
        }
        Some(other) => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[async_trait]
impl ServiceApi for ServiceClient {
    fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    #[instrument(skip(self, template), fields(service = %self.identity.service_name), level = "debug")]
    async fn create(&self, template: &ServiceTemplate) -> RemoteOutcome {
        let payload = self.payload(template);
        let response = match self.send_create(&payload).await {
            Ok(r) => r,
            Err(e) => return RemoteOutcome::Failed(e),
        };

        let status = response.status();
        if status == StatusCode::OK {
            info!(service = %self.identity.service_name, "create returned 200 OK");
            return RemoteOutcome::Ok;
        }

        let body = json_body(response).await;
        let message = error_message(body.as_ref(), "message");
        debug!(status = status.as_u16(), message = %message, "create rejected");
        RemoteOutcome::Failed(ClientError::Remote(format!(
            "Error received while creating service: {message}"
        )))
    }

    #[instrument(skip(self), fields(service = %self.identity.service_name), level = "debug")]
    async fn poll(&self) -> RemoteOutcome {
        let response = match self.send_get().await {
            Ok(r) => r,
            Err(e) => return RemoteOutcome::Failed(e),
        };

        match response.status() {
            StatusCode::OK => {
                let body = json_body(response).await;
                let error = match &body {
                    Some(b) => b.get("error").filter(|e| truthy(e)).map(|e| match e {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    }),
                    // An unreadable 200 body counts as a failure.
                    None => Some(NO_ERROR_MESSAGE.to_string()),
                };

                match error {
                    Some(error) => RemoteOutcome::Failed(ClientError::Remote(format!(
                        "Error received while polling service: {error}"
                    ))),
                    None => RemoteOutcome::Ok,
                }
            }
            StatusCode::NOT_FOUND => {
                let body = json_body(response).await;
                RemoteOutcome::NotFound(error_message(body.as_ref(), "message"))
            }
            other => RemoteOutcome::Failed(ClientError::UnexpectedStatus {
                status: other.as_u16(),
            }),
        }
    }

    #[instrument(skip(self), fields(service = %self.identity.service_name), level = "debug")]
    async fn delete(&self) -> RemoteOutcome {
        let response = match self.send_delete().await {
            Ok(r) => r,
            Err(e) => return RemoteOutcome::Failed(e),
        };

        if response.status() == StatusCode::OK {
            info!(service = %self.identity.service_name, "service deleted");
            return RemoteOutcome::Ok;
        }

        RemoteOutcome::Failed(ClientError::Remote(format!(
            "Cannot delete service '{}'",
            self.identity.service_name
        )))
    }
}
