//! Monit adapter using the embedded HTTP server's `_status` page.
//!
//! Monit renders its status as XML when asked with `format=xml`. The document
//! holds one `<service>` element per configured check:
//!
//! ```xml
//! <?xml version="1.0" encoding="ISO-8859-1"?>
//! <monit>
//!   <service type="3">
//!     <name>sshd</name>
//!     <status>0</status>
//!     <monitor>1</monitor>
//!   </service>
//! </monit>
//! ```
//!
//! Monit declares `ISO-8859-1` by default, so the payload is transcoded to
//! UTF-8 according to its BOM or XML declaration before it is parsed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use monit_adapters::monit::MonitAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MonitAdapter::builder()
//!         .endpoint("https://monit.local:2812/_status?format=xml&level=full")
//!         .credentials("admin", "monit")
//!         .accept_invalid_certs(true)
//!         .build()?;
//!
//!     for check in adapter.collect().await? {
//!         println!("{} ({}): status {}", check.name, check.service_type, check.status);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use encoding_rs::Encoding;
use reqwest::{Client, Url};
use serde::{de, Deserialize, Deserializer};
use tracing::{debug, warn};

use monit_types::{ServiceCheck, ServiceType};

use crate::error::{build_client, check_status, parse_url};
use crate::AdapterError;

/// Default Monit status URL.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:2812/_status?format=xml&level=full";

/// Monit adapter for collecting service checks.
#[derive(Debug, Clone)]
pub struct MonitAdapter {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl MonitAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> MonitAdapterBuilder {
        MonitAdapterBuilder::default()
    }

    /// The status URL this adapter polls.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch and decode the current service checks.
    pub async fn collect(&self) -> Result<Vec<ServiceCheck>, AdapterError> {
        let data = self.fetch_status().await?;
        let checks = parse_status(&data)?;
        debug!(checks = checks.len(), "decoded monit status");
        Ok(checks)
    }

    /// Fetch the raw status document.
    ///
    /// Basic auth is always sent, even with empty credentials.
    pub async fn fetch_status(&self) -> Result<Vec<u8>, AdapterError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        check_status(&response)?;

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

/// Builder for MonitAdapter.
#[derive(Debug, Default)]
pub struct MonitAdapterBuilder {
    endpoint: Option<String>,
    username: Option<String>,
    password: Option<String>,
    accept_invalid_certs: bool,
    timeout: Option<Duration>,
}

impl MonitAdapterBuilder {
    /// Set the status URL (default: [`DEFAULT_ENDPOINT`]).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the username and password for basic auth.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
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
    pub fn build(self) -> Result<MonitAdapter, AdapterError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let endpoint = parse_url(self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT))?;

        Ok(MonitAdapter {
            client: build_client(timeout, self.accept_invalid_certs)?,
            endpoint,
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        })
    }
}

/// Decode a Monit status document into service checks.
///
/// Elements other than `<service>` are ignored, as are the children of
/// `<service>` the exporter does not publish. Missing `<name>`, `<status>`
/// or `<monitor>` fall back to empty/zero.
pub fn parse_status(data: &[u8]) -> Result<Vec<ServiceCheck>, AdapterError> {
    let text = decode_document(data)?;

    let document: StatusDocument =
        quick_xml::de::from_str(&text).map_err(|e| AdapterError::Parse(e.to_string()))?;

    let checks = document
        .services
        .into_iter()
        .map(|service| {
            let service_type = ServiceType::from_code(service.kind);
            if !service_type.is_known() {
                warn!(
                    service = %service.name,
                    code = service.kind,
                    "unmapped monit service type"
                );
            }
            ServiceCheck {
                service_type,
                name: service.name,
                status: service.status,
                monitored: service.monitor,
            }
        })
        .collect();

    Ok(checks)
}

/// Transcode the document to UTF-8.
///
/// A byte-order mark wins over the declaration; without either the document
/// is taken to be UTF-8.
fn decode_document(data: &[u8]) -> Result<Cow<'_, str>, AdapterError> {
    let encoding = match Encoding::for_bom(data) {
        Some((encoding, _)) => encoding,
        None => match declared_encoding(data) {
            // A UTF-16 label on ASCII-readable bytes can only mean UTF-8.
            Some(label) => Encoding::for_label(label.as_bytes())
                .map(|e| e.output_encoding())
                .ok_or(AdapterError::Encoding(label))?,
            None => encoding_rs::UTF_8,
        },
    };

    let (text, actual, had_errors) = encoding.decode(data);
    if had_errors {
        warn!(
            encoding = actual.name(),
            "monit status contained malformed byte sequences"
        );
    }
    Ok(text)
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(data: &[u8]) -> Option<String> {
    let start = data.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &data[start..];
    if !rest.starts_with(b"<?xml") {
        return None;
    }

    let end = rest.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&rest[..end]).ok()?;

    let idx = decl.find("encoding")?;
    let value = decl[idx + "encoding".len()..]
        .trim_start()
        .strip_prefix('=')?
        .trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &value[1..];
    let close = value.find(quote)?;

    Some(value[..close].trim().to_string())
}

/// Root of the Monit status document. The root element name varies between
/// Monit versions and is not checked.
#[derive(Debug, Deserialize)]
struct StatusDocument {
    #[serde(rename = "service", default)]
    services: Vec<ServiceElement>,
}

#[derive(Debug, Deserialize)]
struct ServiceElement {
    #[serde(rename = "@type", default, deserialize_with = "blank_as_zero")]
    kind: i32,
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "blank_as_zero")]
    status: i64,
    #[serde(default)]
    monitor: String,
}

/// Integer text where an empty element or attribute reads as zero.
fn blank_as_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: Display,
{
    let text = String::deserialize(deserializer)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse()
        .map_err(|e| de::Error::custom(format!("invalid integer {text:?}: {e}")))
}
