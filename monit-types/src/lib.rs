//! # monit-types
//!
//! Core types shared by the Monit exporter crates. This crate defines what a
//! scrape produces (service checks from Monit, connected sessions from
//! ejabberd) and the small gauge model the exporter publishes them through.
//!
//! ## Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for [`ConnectedSession`], so the
//!   ejabberd adapter can decode the REST API payload straight into it
//!
//! ## Example
//!
//! ```rust
//! use monit_types::{GaugeVec, MetricDesc, ServiceCheck, ServiceType};
//!
//! let check = ServiceCheck::new(ServiceType::File, "nginx.conf", 0, "1");
//!
//! let mut checks = GaugeVec::new(MetricDesc::new(
//!     "monit_exporter_service_check",
//!     "Monit service check info",
//!     &["check_name", "type", "monitored"],
//! ));
//! checks.set(
//!     &[&check.name, check.service_type.as_str(), &check.monitored],
//!     check.status as f64,
//! );
//!
//! assert_eq!(checks.len(), 1);
//! assert_eq!(checks.get(&["nginx.conf", "file", "1"]), Some(0.0));
//! ```

mod metrics;
mod service;
mod session;

pub use metrics::*;
pub use service::*;
pub use session::*;
