//! The full exporter: HTTP server, collector and adapters against mock
//! Monit and ejabberd backends.

use std::net::SocketAddr;
use std::sync::Arc;

use monit_exporter::{prometheus, Exporter, ExporterConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STATUS_XML: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<monit>
  <service type="5"><name>web01</name><status>0</status><monitor>1</monitor></service>
  <service type="3"><name>sshd</name><status>512</status><monitor>1</monitor></service>
</monit>"#;

const SESSIONS_JSON: &str = r#"[{"jid":"a@b","connection":"c2s_tls","uptime":120}]"#;

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    async fn start(config: ExporterConfig) -> Self {
        let exporter = Arc::new(Exporter::from_config(&config).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(prometheus::serve(
            listener,
            exporter,
            config.metrics_path.clone(),
            async move {
                let _ = rx.await;
            },
        ));

        Self {
            addr,
            shutdown,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        self.handle.await.unwrap().unwrap();
    }
}

fn config_for(backend: &mockito::ServerGuard) -> ExporterConfig {
    ExporterConfig {
        monit_scrape_uri: format!("{}/_status?format=xml&level=full", backend.url()),
        monit_user: "admin".to_string(),
        monit_password: "monit".to_string(),
        ejabberd_uri: backend.url(),
        request_timeout_secs: 5,
        ..ExporterConfig::default()
    }
}

#[tokio::test]
async fn test_metrics_endpoint_reports_both_backends() {
    let mut backend = mockito::Server::new_async().await;
    let monit = backend
        .mock("GET", "/_status")
        .match_query(mockito::Matcher::Any)
        // admin:monit
        .match_header("authorization", "Basic YWRtaW46bW9uaXQ=")
        .with_status(200)
        .with_body(STATUS_XML)
        .create_async()
        .await;
    let ejabberd = backend
        .mock("POST", "/api/connected_users_info")
        .match_body("{}")
        .with_status(200)
        .with_body(SESSIONS_JSON)
        .create_async()
        .await;

    let server = RunningServer::start(config_for(&backend)).await;

    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );
    let body = response.text().await.unwrap();

    assert!(body.contains("monit_exporter_up 1\n"));
    assert!(body.contains(
        "monit_exporter_service_check{check_name=\"sshd\",type=\"program with pidfile\",monitored=\"1\"} 512\n"
    ));
    assert!(body.contains(
        "monit_exporter_service_check{check_name=\"web01\",type=\"system\",monitored=\"1\"} 0\n"
    ));
    assert!(body.contains("monit_ejabberd_connected_users_uptime{jid=\"a@b\"} 120\n"));
    assert!(body.contains("monit_ejabberd_users 1\n"));

    monit.assert_async().await;
    ejabberd.assert_async().await;
    server.stop().await;
}

#[tokio::test]
async fn test_monit_down_skips_ejabberd() {
    let mut backend = mockito::Server::new_async().await;
    let _monit = backend
        .mock("GET", "/_status")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let ejabberd = backend
        .mock("POST", "/api/connected_users_info")
        .with_status(200)
        .with_body(SESSIONS_JSON)
        .expect(0)
        .create_async()
        .await;

    let server = RunningServer::start(config_for(&backend)).await;

    let body = reqwest::get(server.url("/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("monit_exporter_up 0\n"));
    assert!(!body.contains("monit_exporter_service_check{"));
    assert!(!body.contains("monit_ejabberd_connected_users_uptime{"));

    ejabberd.assert_async().await;
    server.stop().await;
}

#[tokio::test]
async fn test_index_health_and_not_found() {
    let backend = mockito::Server::new_async().await;
    let config = ExporterConfig {
        metrics_path: "/probe".to_string(),
        ..config_for(&backend)
    };
    let server = RunningServer::start(config).await;

    let index = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(index.status(), 200);
    let page = index.text().await.unwrap();
    assert!(page.contains("<h1>Monit Exporter</h1>"));
    assert!(page.contains("<a href=\"/probe\">Metrics</a>"));

    let health = reqwest::get(server.url("/healthz")).await.unwrap();
    assert_eq!(health.status(), 200);
    assert_eq!(health.text().await.unwrap(), "OK");

    let missing = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(missing.status(), 404);

    server.stop().await;
}
