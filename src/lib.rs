//! # monit-exporter
//!
//! A Prometheus exporter republishing the state of two backends: the service
//! checks of a [Monit](https://mmonit.com/monit/) daemon and the sessions
//! connected to an [ejabberd](https://www.ejabberd.im/) server.
//!
//! ## Architecture
//!
//! ```text
//!   Prometheus                 monit-exporter
//!  ┌──────────┐  GET /metrics ┌──────────────────────────────────────────┐
//!  │  scrape  │──────────────▶│ prometheus (hyper server)                │
//!  └──────────┘               │      │                                   │
//!                             │      ▼                                   │
//!                             │ collector::Exporter ── lock ──┐          │
//!                             │      │                        ▼          │
//!                             │      │                  Metrics (gauges) │
//!                             │      ▼                                   │
//!                             │ StatusSource ─┬─ MonitAdapter   ── XML ──┼──▶ Monit
//!                             │               └─ EjabberdAdapter ─ JSON ─┼──▶ ejabberd
//!                             └──────────────────────────────────────────┘
//! ```
//!
//! - **[`config`]**: settings from a TOML file and `MONIT_EXPORTER_*` variables
//! - **[`collector`]**: the scrape cycle, the gauges it maintains, and the
//!   [`StatusSource`](collector::StatusSource) seam to the backends
//! - **[`prometheus`]**: text exposition rendering and the HTTP server
//!
//! Fetching and decoding the backends lives in the `monit-adapters` crate;
//! the data and gauge types live in `monit-types`.
//!
//! ## Exported metrics
//!
//! | Metric | Labels | Meaning |
//! |---|---|---|
//! | `monit_exporter_up` | | 1 if the last Monit scrape succeeded |
//! | `monit_exporter_service_check` | `check_name`, `type`, `monitored` | Monit status code |
//! | `monit_ejabberd_connected_users_uptime` | `jid` | session uptime in seconds |
//! | `monit_ejabberd_users` | | number of connected sessions |
//!
//! ## Usage
//!
//! ```bash
//! monit-exporter --conf /etc/monit-exporter/config.toml
//! ```

pub mod collector;
pub mod config;
pub mod prometheus;

pub use crate::collector::{Exporter, HttpStatusSource, Metrics, ScrapeOutcome, StatusSource};
pub use crate::config::ExporterConfig;
