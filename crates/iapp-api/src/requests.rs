//! Request bodies sent to the appliance and the device cluster

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::params::Protocol;

const TENANT_TEMPLATE_REFERENCE_ENDPOINT: &str = "/mgmt/cm/cloud/tenant/templates/iapp/";
const TENANT_REFERENCE_ENDPOINT: &str = "/mgmt/cm/cloud/tenants/";

/// Reference to another appliance resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub link: String,
}

/// Body of an iApp service creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationRequest {
    pub name: String,
    pub tenant_template_reference: Link,
    pub tenant_reference: Link,
    pub vars: Map<String, Value>,
    pub tables: Map<String, Value>,
    pub properties: Map<String, Value>,
}

impl CreationRequest {
    /// Start building a creation request for `service` from `template` in `tenant`
    ///
    /// # Example
    /// ```
    /// use iapp_api::{CreationRequest, Protocol};
    ///
    /// let request = CreationRequest::builder("tenant1", "service1", "template1")
    ///     .reference(Protocol::Https, "iwf.local", 443)
    ///     .build();
    ///
    /// assert_eq!(
    ///     request.tenant_reference.link,
    ///     "https://iwf.local/mgmt/cm/cloud/tenants/tenant1"
    /// );
    /// ```
    #[must_use]
    pub fn builder(
        tenant: impl Into<String>,
        service: impl Into<String>,
        template: impl Into<String>,
    ) -> CreationRequestBuilder {
        CreationRequestBuilder::new(tenant.into(), service.into(), template.into())
    }
}

/// Builder for [`CreationRequest`]
#[derive(Debug, Clone)]
pub struct CreationRequestBuilder {
    tenant: String,
    service: String,
    template: String,
    vars: Map<String, Value>,
    tables: Map<String, Value>,
    properties: Map<String, Value>,
    proto: Protocol,
    reference_host: String,
}

impl CreationRequestBuilder {
    fn new(tenant: String, service: String, template: String) -> Self {
        Self {
            tenant,
            service,
            template,
            vars: Map::new(),
            tables: Map::new(),
            properties: Map::new(),
            proto: Protocol::Https,
            reference_host: "localhost".to_string(),
        }
    }

    /// Template variables
    #[must_use]
    pub fn vars(mut self, vars: Map<String, Value>) -> Self {
        self.vars = vars;
        self
    }

    /// Template tables
    #[must_use]
    pub fn tables(mut self, tables: Map<String, Value>) -> Self {
        self.tables = tables;
        self
    }

    /// Service properties
    #[must_use]
    pub fn properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Host the tenant and template reference links point at
    ///
    /// The port is accepted for parity with the connection parameters but is
    /// not written into either link.
    #[must_use]
    pub fn reference(mut self, proto: Protocol, host: impl Into<String>, _port: u16) -> Self {
        self.proto = proto;
        self.reference_host = host.into();
        self
    }

    #[must_use]
    pub fn build(self) -> CreationRequest {
        let template_link = format!(
            "{}://{}{TENANT_TEMPLATE_REFERENCE_ENDPOINT}{}",
            self.proto, self.reference_host, self.template
        );
        let tenant_link = format!(
            "{}://{}{TENANT_REFERENCE_ENDPOINT}{}",
            self.proto, self.reference_host, self.tenant
        );

        CreationRequest {
            name: self.service,
            tenant_template_reference: Link {
                link: template_link,
            },
            tenant_reference: Link { link: tenant_link },
            vars: self.vars,
            tables: self.tables,
            properties: self.properties,
        }
    }
}

/// Command posted to the device cluster's config endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCommand {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub util_cmd_args: Option<String>,
}

impl ClusterCommand {
    /// Persist the running configuration
    #[must_use]
    pub fn save() -> Self {
        Self {
            command: "save".to_string(),
            util_cmd_args: None,
        }
    }

    /// Push configuration to every device in `group`
    #[must_use]
    pub fn sync_to_group(group: &str) -> Self {
        Self {
            command: "run".to_string(),
            util_cmd_args: Some(format!("to-group {group}")),
        }
    }
}
