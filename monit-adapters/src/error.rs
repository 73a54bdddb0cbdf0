//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when fetching or decoding backend status.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed or returned a non-success status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The document declares a character encoding we cannot decode.
    #[error("Unsupported encoding: {0}")]
    Encoding(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The configured endpoint is not a valid URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

/// Turn a non-success response status into an error.
pub(crate) fn check_status(response: &reqwest::Response) -> Result<(), AdapterError> {
    let status = response.status();

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(AdapterError::Auth("Invalid credentials".to_string()));
    }

    if !status.is_success() {
        return Err(AdapterError::Http(format!(
            "{} returned status {}",
            response.url(),
            status
        )));
    }

    Ok(())
}

/// Build the HTTP client shared by the adapters.
pub(crate) fn build_client(
    timeout: std::time::Duration,
    accept_invalid_certs: bool,
) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| AdapterError::Http(format!("Failed to build HTTP client: {}", e)))
}

/// Parse an endpoint URL up front so a typo fails at startup, not at scrape.
pub(crate) fn parse_url(url: &str) -> Result<reqwest::Url, AdapterError> {
    reqwest::Url::parse(url).map_err(|e| AdapterError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
