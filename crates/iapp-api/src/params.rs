//! Identity and connection parameters supplied by the host engine

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A required parameter was missing or empty
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0} is required")]
pub struct MissingParam(pub &'static str);

/// Identifies a service within a tenant on the appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Tenant that owns the service
    pub tenant_name: String,
    /// Service (iApp) name
    pub service_name: String,
}

impl ServiceIdentity {
    pub fn new(tenant_name: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            tenant_name: tenant_name.into(),
            service_name: service_name.into(),
        }
    }

    /// Check that both names are set
    ///
    /// # Errors
    /// Returns `MissingParam` naming the first empty field.
    pub fn validate(&self) -> Result<(), MissingParam> {
        if self.tenant_name.trim().is_empty() {
            return Err(MissingParam("Tenant name"));
        }
        if self.service_name.trim().is_empty() {
            return Err(MissingParam("Service name"));
        }
        Ok(())
    }
}

/// URL scheme used for appliance requests and reference links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appliance connection parameters
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Appliance address
    pub ip: String,
    /// Appliance port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Basic auth user
    pub user: String,
    /// Basic auth password
    pub password: String,
    /// Use `https` instead of `http`
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
}

fn default_port() -> u16 {
    443
}

fn default_use_ssl() -> bool {
    true
}

impl ConnectionParams {
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        if self.use_ssl {
            Protocol::Https
        } else {
            Protocol::Http
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("ip", &self.ip)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .finish()
    }
}

/// The iApp template a service is created from, with its inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    /// Template name on the appliance
    pub template_name: String,
    /// Host written into the tenant and template reference links
    #[serde(default = "default_reference_hostname")]
    pub reference_hostname: String,
    #[serde(default)]
    pub vars: Map<String, Value>,
    #[serde(default)]
    pub tables: Map<String, Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

fn default_reference_hostname() -> String {
    "localhost".to_string()
}

impl ServiceTemplate {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            reference_hostname: default_reference_hostname(),
            ..Default::default()
        }
    }

    /// Check that the template name is set
    ///
    /// # Errors
    /// Returns `MissingParam` if the template name is empty.
    pub fn validate(&self) -> Result<(), MissingParam> {
        if self.template_name.trim().is_empty() {
            return Err(MissingParam("Template name"));
        }
        Ok(())
    }
}
