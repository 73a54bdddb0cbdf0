//! Exporter configuration.
//!
//! Settings come from a TOML file and from `MONIT_EXPORTER_*` environment
//! variables, the latter taking precedence. Every key is optional:
//!
//! ```toml
//! listen_address = "localhost:9388"
//! metrics_path = "/metrics"
//! ignore_ssl = false
//! monit_scrape_uri = "http://localhost:2812/_status?format=xml&level=full"
//! monit_user = "admin"
//! monit_password = "monit"
//! ejabberd_uri = "http://localhost:5280"
//! request_timeout_secs = 10
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::info;

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "MONIT_EXPORTER";

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to (host names are resolved).
    pub listen_address: String,
    /// Path serving the metrics.
    pub metrics_path: String,
    /// Skip TLS certificate verification for both backends.
    pub ignore_ssl: bool,
    pub monit_scrape_uri: String,
    pub monit_user: String,
    pub monit_password: String,
    /// Base URL of the ejabberd HTTP listener.
    pub ejabberd_uri: String,
    /// Per-request timeout for backend calls.
    pub request_timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: "localhost:9388".to_string(),
            metrics_path: "/metrics".to_string(),
            ignore_ssl: false,
            monit_scrape_uri: monit_adapters::monit::DEFAULT_ENDPOINT.to_string(),
            monit_user: String::new(),
            monit_password: String::new(),
            ejabberd_uri: monit_adapters::ejabberd::DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ExporterConfig {
    /// Load the configuration from `path` and the environment.
    ///
    /// A missing or unreadable file is not an error: the defaults (plus any
    /// environment overrides) are used instead. A value of the wrong type is.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = match Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(environment())
            .build()
        {
            Ok(settings) => settings,
            Err(e) => {
                info!(
                    "Error reading config file {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Config::builder().add_source(environment()).build()?
            }
        };

        let config: ExporterConfig = settings
            .try_deserialize()
            .context("Invalid exporter configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Check settings that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if !self.metrics_path.starts_with('/') {
            bail!("metrics_path must start with '/': {:?}", self.metrics_path);
        }
        if self.metrics_path == "/" {
            bail!("metrics_path cannot be '/', which serves the index page");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
}
