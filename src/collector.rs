//! Scrape orchestration: fetch both backends and rebuild the gauges.
//!
//! Every metrics request runs one scrape while holding the exporter's lock,
//! so overlapping requests are serialized and each sees a snapshot built by
//! exactly one scrape.
//!
//! The two backends fail independently. A Monit failure drops
//! `monit_exporter_up` to 0, clears the service checks and skips ejabberd
//! entirely. An ejabberd failure is only logged: the fresh Monit gauges stay
//! published and the session gauges keep whatever the previous successful
//! scrape left in them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error};

use monit_adapters::ejabberd::EjabberdAdapter;
use monit_adapters::monit::MonitAdapter;
use monit_adapters::AdapterError;
use monit_types::{ConnectedSession, Gauge, GaugeVec, MetricDesc, ServiceCheck};

use crate::config::ExporterConfig;
use crate::prometheus::format_metrics;

/// Prefix for every exported metric name.
pub const NAMESPACE: &str = "monit";

/// Where a scrape gets its data from.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Current Monit service checks.
    async fn service_checks(&self) -> Result<Vec<ServiceCheck>, AdapterError>;

    /// Sessions currently connected to ejabberd.
    async fn connected_sessions(&self) -> Result<Vec<ConnectedSession>, AdapterError>;
}

/// [`StatusSource`] polling the real backends over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    monit: MonitAdapter,
    ejabberd: EjabberdAdapter,
}

impl HttpStatusSource {
    pub fn new(monit: MonitAdapter, ejabberd: EjabberdAdapter) -> Self {
        Self { monit, ejabberd }
    }

    /// Build both adapters from the exporter configuration.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, AdapterError> {
        let monit = MonitAdapter::builder()
            .endpoint(config.monit_scrape_uri.as_str())
            .credentials(config.monit_user.as_str(), config.monit_password.as_str())
            .accept_invalid_certs(config.ignore_ssl)
            .timeout(config.request_timeout())
            .build()?;

        let ejabberd = EjabberdAdapter::builder()
            .endpoint(config.ejabberd_uri.as_str())
            .accept_invalid_certs(config.ignore_ssl)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self::new(monit, ejabberd))
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn service_checks(&self) -> Result<Vec<ServiceCheck>, AdapterError> {
        self.monit.collect().await
    }

    async fn connected_sessions(&self) -> Result<Vec<ConnectedSession>, AdapterError> {
        self.ejabberd.collect().await
    }
}

/// The gauges published by the exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// 1 when the last Monit fetch and decode succeeded.
    pub up: Gauge,
    /// Status code per `(check_name, type, monitored)`.
    pub service_check: GaugeVec,
    /// Uptime in seconds per `jid`.
    pub users_uptime: GaugeVec,
    /// Number of connected sessions.
    pub users: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let [up, service_check, users_uptime, users] = descriptions();
        Self {
            up: Gauge::new(up),
            service_check: GaugeVec::new(service_check),
            users_uptime: GaugeVec::new(users_uptime),
            users: Gauge::new(users),
        }
    }

    fn apply_checks(&mut self, checks: &[ServiceCheck]) {
        self.up.set(1.0);
        self.service_check.reset();
        for check in checks {
            self.service_check.set(
                &[&check.name, check.service_type.as_str(), &check.monitored],
                check.status as f64,
            );
        }
    }

    fn mark_down(&mut self) {
        self.up.set(0.0);
        self.service_check.reset();
    }

    fn apply_sessions(&mut self, sessions: &[ConnectedSession]) {
        self.users_uptime.reset();
        for session in sessions {
            self.users_uptime.set(&[&session.jid], session.uptime as f64);
        }
        self.users.set(sessions.len() as f64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn metric_name(name: &str) -> String {
    format!("{}_{}", NAMESPACE, name)
}

fn descriptions() -> [MetricDesc; 4] {
    [
        MetricDesc::new(metric_name("exporter_up"), "Monit status availability", &[]),
        MetricDesc::new(
            metric_name("exporter_service_check"),
            "Monit service check info",
            &["check_name", "type", "monitored"],
        ),
        MetricDesc::new(
            metric_name("ejabberd_connected_users_uptime"),
            "Ejabberd connected users uptime",
            &["jid"],
        ),
        MetricDesc::new(metric_name("ejabberd_users"), "Ejabberd total users count", &[]),
    ]
}

/// Result of one scrape, reported per backend.
#[derive(Debug)]
pub struct ScrapeOutcome {
    /// Number of service checks published, or why Monit failed.
    pub monit: Result<usize, AdapterError>,
    /// Number of sessions published, or why ejabberd failed. `None` when
    /// the Monit failure meant ejabberd was never asked.
    pub ejabberd: Option<Result<usize, AdapterError>>,
}

impl ScrapeOutcome {
    /// Whether both backends were scraped successfully.
    pub fn is_success(&self) -> bool {
        self.monit.is_ok() && matches!(self.ejabberd, Some(Ok(_)))
    }
}

/// Owns the gauges and serializes scrapes over them.
pub struct Exporter {
    source: Arc<dyn StatusSource>,
    metrics: Mutex<Metrics>,
}

impl Exporter {
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            metrics: Mutex::new(Metrics::new()),
        }
    }

    /// Create an exporter polling the backends named in `config`.
    pub fn from_config(config: &ExporterConfig) -> Result<Self, AdapterError> {
        let source = HttpStatusSource::from_config(config)?;
        Ok(Self::new(Arc::new(source)))
    }

    /// Every metric family this exporter can emit, independent of data.
    pub fn describe() -> Vec<MetricDesc> {
        descriptions().into_iter().collect()
    }

    /// Run one scrape and render the resulting gauges in text exposition
    /// format. Concurrent callers wait for each other.
    pub async fn collect(&self) -> String {
        let mut metrics = self.metrics.lock().await;
        metrics.service_check.reset();
        let outcome = scrape(self.source.as_ref(), &mut metrics).await;
        debug!(success = outcome.is_success(), "scrape finished");
        format_metrics(&metrics)
    }

    /// Run one scrape without rendering.
    pub async fn scrape(&self) -> ScrapeOutcome {
        let mut metrics = self.metrics.lock().await;
        scrape(self.source.as_ref(), &mut metrics).await
    }

    /// Copy of the current gauges.
    pub async fn metrics(&self) -> Metrics {
        self.metrics.lock().await.clone()
    }
}

async fn scrape(source: &dyn StatusSource, metrics: &mut Metrics) -> ScrapeOutcome {
    let checks = match source.service_checks().await {
        Ok(checks) => checks,
        Err(e) => {
            metrics.mark_down();
            error!("Error getting monit status: {}", e);
            return ScrapeOutcome {
                monit: Err(e),
                ejabberd: None,
            };
        }
    };
    metrics.apply_checks(&checks);

    let ejabberd = match source.connected_sessions().await {
        Ok(sessions) => {
            metrics.apply_sessions(&sessions);
            Ok(sessions.len())
        }
        Err(e) => {
            error!("Error getting ejabberd status: {}", e);
            Err(e)
        }
    };

    ScrapeOutcome {
        monit: Ok(checks.len()),
        ejabberd: Some(ejabberd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use monit_types::ServiceType;

    type ChecksResult = Result<Vec<ServiceCheck>, AdapterError>;
    type SessionsResult = Result<Vec<ConnectedSession>, AdapterError>;

    /// Hands out queued results, one per call.
    #[derive(Default)]
    struct ScriptedSource {
        checks: std::sync::Mutex<VecDeque<ChecksResult>>,
        sessions: std::sync::Mutex<VecDeque<SessionsResult>>,
        session_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn push_checks(self, result: ChecksResult) -> Self {
            self.checks.lock().unwrap().push_back(result);
            self
        }

        fn push_sessions(self, result: SessionsResult) -> Self {
            self.sessions.lock().unwrap().push_back(result);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn service_checks(&self) -> ChecksResult {
            let next = self.checks.lock().unwrap().pop_front();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            next.unwrap_or_else(|| Err(AdapterError::Http("script exhausted".to_string())))
        }

        async fn connected_sessions(&self) -> SessionsResult {
            self.session_calls.fetch_add(1, Ordering::SeqCst);
            let next = self.sessions.lock().unwrap().pop_front();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            next.unwrap_or_else(|| Err(AdapterError::Http("script exhausted".to_string())))
        }
    }

    fn check(kind: ServiceType, name: &str, status: i64) -> ServiceCheck {
        ServiceCheck::new(kind, name, status, "1")
    }

    fn build_exporter(source: ScriptedSource) -> (Exporter, Arc<ScriptedSource>) {
        let source = Arc::new(source);
        (Exporter::new(source.clone()), source)
    }

    #[test]
    fn test_describe_is_static() {
        let names: Vec<String> = Exporter::describe().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec![
                "monit_exporter_up",
                "monit_exporter_service_check",
                "monit_ejabberd_connected_users_uptime",
                "monit_ejabberd_users",
            ]
        );
    }

    #[tokio::test]
    async fn test_scrape_publishes_every_check() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![
                    check(ServiceType::System, "web01", 0),
                    check(ServiceType::ProcessPidfile, "sshd", 512),
                    ServiceCheck::new(ServiceType::Filesystem, "rootfs", 0, "0"),
                ]))
                .push_sessions(Ok(vec![])),
        );

        let outcome = exporter.scrape().await;
        assert!(outcome.is_success());
        assert_eq!(outcome.monit.unwrap(), 3);

        let metrics = exporter.metrics().await;
        assert_eq!(metrics.up.get(), 1.0);
        assert_eq!(metrics.service_check.len(), 3);
        assert_eq!(
            metrics.service_check.get(&["sshd", "program with pidfile", "1"]),
            Some(512.0)
        );
        assert_eq!(
            metrics.service_check.get(&["rootfs", "filesystem", "0"]),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_vanished_check_is_dropped() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![
                    check(ServiceType::File, "a.conf", 0),
                    check(ServiceType::File, "b.conf", 0),
                ]))
                .push_sessions(Ok(vec![]))
                .push_checks(Ok(vec![check(ServiceType::File, "a.conf", 0)]))
                .push_sessions(Ok(vec![])),
        );

        exporter.collect().await;
        let output = exporter.collect().await;

        assert!(output.contains(r#"check_name="a.conf""#));
        assert!(!output.contains(r#"check_name="b.conf""#));
        assert_eq!(exporter.metrics().await.service_check.len(), 1);
    }

    #[tokio::test]
    async fn test_monit_failure_marks_down_and_skips_ejabberd() {
        let (exporter, source) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![check(ServiceType::System, "web01", 0)]))
                .push_sessions(Ok(vec![ConnectedSession::new("a@b", 120)]))
                .push_checks(Err(AdapterError::Connection("refused".to_string()))),
        );

        assert!(exporter.scrape().await.is_success());
        let outcome = exporter.scrape().await;

        assert!(matches!(outcome.monit, Err(AdapterError::Connection(_))));
        assert!(outcome.ejabberd.is_none());
        assert_eq!(source.session_calls.load(Ordering::SeqCst), 1);

        let metrics = exporter.metrics().await;
        assert_eq!(metrics.up.get(), 0.0);
        assert!(metrics.service_check.is_empty());
    }

    #[tokio::test]
    async fn test_monit_decode_failure_marks_down() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default().push_checks(Err(AdapterError::Parse("bad xml".to_string()))),
        );

        let output = exporter.collect().await;

        assert!(output.contains("monit_exporter_up 0\n"));
        assert!(!output.contains("monit_exporter_service_check{"));
    }

    #[tokio::test]
    async fn test_ejabberd_failure_keeps_previous_sessions() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![check(ServiceType::System, "web01", 0)]))
                .push_sessions(Ok(vec![
                    ConnectedSession::new("a@b", 120),
                    ConnectedSession::new("c@d", 30),
                ]))
                .push_checks(Ok(vec![check(ServiceType::Network, "eth0", 0)]))
                .push_sessions(Err(AdapterError::Timeout)),
        );

        exporter.scrape().await;
        let outcome = exporter.scrape().await;

        assert!(outcome.monit.is_ok());
        assert!(matches!(outcome.ejabberd, Some(Err(AdapterError::Timeout))));
        assert!(!outcome.is_success());

        let metrics = exporter.metrics().await;
        assert_eq!(metrics.up.get(), 1.0);
        assert_eq!(metrics.service_check.len(), 1);
        assert_eq!(metrics.service_check.get(&["eth0", "network", "1"]), Some(0.0));
        // sessions still hold the first scrape's values
        assert_eq!(metrics.users.get(), 2.0);
        assert_eq!(metrics.users_uptime.get(&["a@b"]), Some(120.0));
    }

    #[tokio::test]
    async fn test_sessions_are_replaced() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![]))
                .push_sessions(Ok(vec![
                    ConnectedSession::new("a@b", 120),
                    ConnectedSession::new("c@d", 30),
                ]))
                .push_checks(Ok(vec![]))
                .push_sessions(Ok(vec![ConnectedSession::new("a@b", 150)])),
        );

        exporter.scrape().await;
        exporter.scrape().await;

        let metrics = exporter.metrics().await;
        assert_eq!(metrics.users.get(), 1.0);
        assert_eq!(metrics.users_uptime.len(), 1);
        assert_eq!(metrics.users_uptime.get(&["a@b"]), Some(150.0));
        assert_eq!(metrics.users_uptime.get(&["c@d"]), None);
    }

    #[tokio::test]
    async fn test_single_session_count() {
        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .push_checks(Ok(vec![]))
                .push_sessions(Ok(vec![ConnectedSession::new("a@b", 120)])),
        );

        let output = exporter.collect().await;

        assert!(output.contains("monit_ejabberd_connected_users_uptime{jid=\"a@b\"} 120\n"));
        assert!(output.contains("monit_ejabberd_users 1\n"));
    }

    #[tokio::test]
    async fn test_concurrent_collects_do_not_interleave() {
        let first: Vec<ServiceCheck> = (0..5)
            .map(|i| check(ServiceType::File, &format!("first-{}", i), 0))
            .collect();
        let second: Vec<ServiceCheck> = (0..3)
            .map(|i| check(ServiceType::Directory, &format!("second-{}", i), 1))
            .collect();

        let (exporter, _) = build_exporter(
            ScriptedSource::default()
                .with_delay(Duration::from_millis(20))
                .push_checks(Ok(first))
                .push_sessions(Ok(vec![ConnectedSession::new("a@b", 1)]))
                .push_checks(Ok(second))
                .push_sessions(Ok(vec![ConnectedSession::new("c@d", 2)])),
        );

        let (a, b) = tokio::join!(exporter.collect(), exporter.collect());

        for output in [&a, &b] {
            let firsts = output.matches("check_name=\"first-").count();
            let seconds = output.matches("check_name=\"second-").count();
            assert!(
                (firsts == 5 && seconds == 0) || (firsts == 0 && seconds == 3),
                "mixed snapshot: {}",
                output
            );
        }
        assert_ne!(a, b);
    }
}
