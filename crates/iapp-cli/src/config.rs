//! Configuration loading and types

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use serde::Deserialize;

use iapp_api::{ConnectionParams, ServiceIdentity, ServiceTemplate};
use iapp_core::{ClusterTarget, RetryConfig};

/// Top-level configuration for the `iapp` binary
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Appliance connection parameters
    pub connection: ConnectionParams,
    /// Service node properties
    pub service: ServiceConfig,
    /// Device cluster to sync after creation, required by `create`
    #[serde(default)]
    pub bigip: Option<ClusterTarget>,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Node properties of the service being managed
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub tenant_name: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(flatten)]
    pub template: ServiceTemplate,
}

impl ServiceConfig {
    #[must_use]
    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(&self.tenant_name, &self.service_name)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).wrap_err_with(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, `IAPP_CONFIG`, or the default locations
    ///
    /// # Errors
    /// Returns error if no file is found or the file cannot be parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var("IAPP_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        let mut paths = vec![
            PathBuf::from("iapp.toml"),
            PathBuf::from("/etc/iapp/iapp.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("iapp/iapp.toml"));
        }

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        eyre::bail!("no config file found (tried --config, IAPP_CONFIG, iapp.toml, /etc/iapp/iapp.toml)")
    }
}
