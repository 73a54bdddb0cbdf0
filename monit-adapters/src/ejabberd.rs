//! ejabberd adapter using the REST API (`mod_http_api`).
//!
//! Sessions come from the `connected_users_info` command, which is invoked by
//! POSTing an empty JSON object to `<base>/api/connected_users_info`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use monit_adapters::ejabberd::EjabberdAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = EjabberdAdapter::builder()
//!         .endpoint("http://localhost:5280")
//!         .build()?;
//!
//!     for session in adapter.collect().await? {
//!         println!("{} connected for {}s", session.jid, session.uptime);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use monit_types::ConnectedSession;

use crate::error::{build_client, check_status, parse_url};
use crate::AdapterError;

/// Default ejabberd HTTP listener.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5280";

const CONNECTED_USERS_PATH: &str = "api/connected_users_info";

/// ejabberd adapter for collecting connected sessions.
#[derive(Debug, Clone)]
pub struct EjabberdAdapter {
    client: Client,
    command_url: Url,
}

impl EjabberdAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> EjabberdAdapterBuilder {
        EjabberdAdapterBuilder::default()
    }

    /// The full URL of the `connected_users_info` command.
    pub fn command_url(&self) -> &Url {
        &self.command_url
    }

    /// Fetch and decode the currently connected sessions.
    pub async fn collect(&self) -> Result<Vec<ConnectedSession>, AdapterError> {
        let data = self.fetch_connected_users().await?;
        let sessions = parse_connected_users(&data)?;
        debug!(sessions = sessions.len(), "decoded ejabberd sessions");
        Ok(sessions)
    }

    /// Invoke `connected_users_info` and return the raw response body.
    pub async fn fetch_connected_users(&self) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .client
            .post(self.command_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await?;

        check_status(&response)?;

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Builder for EjabberdAdapter.
#[derive(Debug, Default)]
pub struct EjabberdAdapterBuilder {
    endpoint: Option<String>,
    accept_invalid_certs: bool,
    timeout: Option<Duration>,
}

impl EjabberdAdapterBuilder {
    /// Set the base URL of the ejabberd HTTP listener (default: [`DEFAULT_ENDPOINT`]).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Skip TLS certificate verification (default: false).
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<EjabberdAdapter, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let base = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

        Ok(EjabberdAdapter {
            client: build_client(timeout, self.accept_invalid_certs)?,
            command_url: command_url(base)?,
        })
    }
}

// Join the command path onto the base, keeping any prefix the base carries.
fn command_url(base: &str) -> Result<Url, AdapterError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), CONNECTED_USERS_PATH);
    parse_url(&joined)
}

/// Decode a `connected_users_info` response.
///
/// An empty body or `null` means no sessions. Anything that is not a JSON
/// array of objects is an error.
pub fn parse_connected_users(data: &[u8]) -> Result<Vec<ConnectedSession>, AdapterError> {
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Vec::new());
    }

    let sessions: Option<Vec<ConnectedSession>> =
        serde_json::from_slice(data).map_err(|e| AdapterError::Parse(e.to_string()))?;

    Ok(sessions.unwrap_or_default())
}
