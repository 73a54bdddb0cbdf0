//! # monit-adapters
//!
//! Adapters that poll the two backends the exporter republishes.
//!
//! ## Supported Systems
//!
//! - **Monit** (`monit` feature) - Fetches the `_status` XML over HTTP with
//!   basic auth and decodes it into [`ServiceCheck`]s
//! - **ejabberd** (`ejabberd` feature) - Calls the `connected_users_info`
//!   REST command and decodes it into [`ConnectedSession`]s
//!
//! Fetching and decoding are separate steps, so the decoders can be used on
//! payloads obtained some other way.
//!
//! ## Quick Start (Monit)
//!
//! ```rust,no_run
//! use monit_adapters::monit::MonitAdapter;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = MonitAdapter::builder()
//!         .endpoint("http://localhost:2812/_status?format=xml&level=full")
//!         .credentials("admin", "monit")
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     let checks = adapter.collect().await?;
//!
//!     println!("Collected {} service checks", checks.len());
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "monit")]
pub mod monit;

#[cfg(feature = "ejabberd")]
pub mod ejabberd;

pub use error::AdapterError;

// Re-export types for convenience
pub use monit_types::{ConnectedSession, ServiceCheck, ServiceType};
