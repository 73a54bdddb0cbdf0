//! Prometheus exposition format and the HTTP server serving it.
//!
//! The server answers three kinds of requests:
//!
//! - the configured metrics path runs a scrape and returns the gauges in the
//!   text-based exposition format
//! - `/` returns a small HTML page linking to the metrics path
//! - `/health` and `/healthz` return `OK` without touching the backends
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use monit_exporter::collector::Exporter;
//! use monit_exporter::config::ExporterConfig;
//! use monit_exporter::prometheus;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExporterConfig::default();
//!     let exporter = Arc::new(Exporter::from_config(&config)?);
//!
//!     let listener = TcpListener::bind(&config.listen_address).await?;
//!     prometheus::serve(listener, exporter, config.metrics_path, std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use monit_types::{Gauge, GaugeVec, MetricDesc};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::collector::{Exporter, Metrics};

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Accept connections until `shutdown` resolves.
///
/// Accept errors are logged and do not stop the server.
///
/// Each connection is served on its own task. A scrape only starts when a
/// request for `metrics_path` arrives; concurrent scrapes queue on the
/// exporter's lock.
pub async fn serve<F>(
    listener: TcpListener,
    exporter: Arc<Exporter>,
    metrics_path: String,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let metrics_path: Arc<str> = Arc::from(metrics_path);
    tokio::pin!(shutdown);

    if let Ok(addr) = listener.local_addr() {
        info!("Serving metrics on http://{}{}", addr, metrics_path);
    }

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                info!("Shutting down metrics server");
                return Ok(());
            }
        };
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!(%peer, "accepted connection");
        let io = TokioIo::new(stream);

        let exporter = exporter.clone();
        let metrics_path = metrics_path.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                let exporter = exporter.clone();
                let metrics_path = metrics_path.clone();
                let path = req.uri().path().to_owned();

                async move { handle_request(&path, &exporter, &metrics_path).await }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Metrics connection error: {}", e);
            }
        });
    }
}

async fn handle_request(
    path: &str,
    exporter: &Exporter,
    metrics_path: &str,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = if path == metrics_path {
        let body = exporter.collect().await;
        response(StatusCode::OK, EXPOSITION_CONTENT_TYPE, body)
    } else if path == "/" {
        response(
            StatusCode::OK,
            "text/html; charset=utf-8",
            index_page(metrics_path),
        )
    } else if path == "/health" || path == "/healthz" {
        response(StatusCode::OK, "text/plain", "OK")
    } else {
        response(StatusCode::NOT_FOUND, "text/plain", "Not Found")
    };

    Ok(response)
}

fn response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Landing page linking to the metrics path.
pub fn index_page(metrics_path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>Monit Exporter</title></head>\n\
         <body>\n\
         <h1>Monit Exporter</h1>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        escape_html(metrics_path)
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Format the exporter's gauges as Prometheus exposition format.
pub fn format_metrics(metrics: &Metrics) -> String {
    let mut output = String::new();

    write_gauge(&mut output, &metrics.up);
    write_gauge_vec(&mut output, &metrics.service_check);
    write_gauge_vec(&mut output, &metrics.users_uptime);
    write_gauge(&mut output, &metrics.users);

    output
}

fn write_header(output: &mut String, desc: &MetricDesc) {
    output.push_str(&format!(
        "# HELP {} {}\n",
        desc.name,
        escape_help(&desc.help)
    ));
    output.push_str(&format!("# TYPE {} gauge\n", desc.name));
}

fn write_gauge(output: &mut String, gauge: &Gauge) {
    let desc = gauge.desc();
    write_header(output, desc);
    output.push_str(&format!("{} {}\n", desc.name, format_value(gauge.get())));
}

fn write_gauge_vec(output: &mut String, gauges: &GaugeVec) {
    let desc = gauges.desc();
    write_header(output, desc);

    for (values, value) in gauges.samples() {
        let labels = desc
            .label_names
            .iter()
            .zip(values)
            .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
            .collect::<Vec<_>>()
            .join(",");

        output.push_str(&format!(
            "{}{{{}}} {}\n",
            desc.name,
            labels,
            format_value(value)
        ));
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Escape a label value for Prometheus format.
/// Backslash, double-quote, and newline must be escaped.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

// HELP text only escapes backslash and newline.
fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}
