//! The real Compute Engine, Cloudflare and command channel adapters wired
//! together against mock servers.
//!
//! The mocked instance reports `127.0.0.1` as its external address, so the
//! command channel reaches the mock sidecar listening on localhost.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, Utc};
use hibernate::api::{AppState, router};
use hibernate::application::ports::Clock;
use hibernate::application::services::{
    DnsReconciler, IdleMonitor, IdleSettings, LifecycleController, PollPolicy, ProbeTarget,
    RelayGateway,
};
use hibernate::domain::{BearerSecret, InstanceId};
use hibernate::infra::activity::FileActivityStore;
use hibernate::infra::channel::HttpCommandChannel;
use hibernate::infra::cloudflare::CloudflareDns;
use hibernate::infra::gce::GceComputeProvider;
use hibernate::infra::google_auth::TokenSource;
use hibernate_common::ShutdownPolicy;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_is, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTANCE_PATH: &str = "/projects/proj/zones/europe-west1-b/instances/mc";
const RECORDS_PATH: &str = "/zones/zone-1/dns_records";
const CHANNEL_KEY: &str = "channel-secret";

fn instance_body(status: &str, nat_ip: Option<&str>) -> ResponseTemplate {
    let access_configs = nat_ip.map_or_else(
        || serde_json::json!([{"name": "External NAT"}]),
        |ip| serde_json::json!([{"name": "External NAT", "natIP": ip}]),
    );
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "name": "mc",
        "status": status,
        "networkInterfaces": [{"networkIP": "10.132.0.2", "accessConfigs": access_configs}]
    }))
}

fn compute(gce: &MockServer) -> Arc<GceComputeProvider> {
    Arc::new(
        GceComputeProvider::new(Duration::from_secs(5), Arc::new(TokenSource::fixed("ya29.e2e")))
            .expect("compute client")
            .with_base_url(gce.uri()),
    )
}

fn channel(sidecar: &MockServer) -> Arc<HttpCommandChannel> {
    Arc::new(
        HttpCommandChannel::new(sidecar.address().port(), CHANNEL_KEY, Duration::from_secs(5))
            .expect("channel client"),
    )
}

fn id() -> InstanceId {
    InstanceId::new("proj", "europe-west1-b", "mc")
}

async fn send(app: axum::Router, uri: &str, bearer: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
}

#[tokio::test]
async fn start_dns_and_relay_through_real_adapters() {
    let gce = MockServer::start().await;
    let cloudflare = MockServer::start().await;
    let sidecar = MockServer::start().await;

    // Terminated on the first query, running with an address afterwards.
    Mock::given(method("GET"))
        .and(path(INSTANCE_PATH))
        .respond_with(instance_body("TERMINATED", None))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&gce)
        .await;
    Mock::given(method("GET"))
        .and(path(INSTANCE_PATH))
        .respond_with(instance_body("RUNNING", Some("127.0.0.1")))
        .mount(&gce)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{INSTANCE_PATH}/start")))
        .and(header_is("authorization", "Bearer ya29.e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "compute#operation", "status": "PENDING"
        })))
        .expect(1)
        .mount(&gce)
        .await;

    Mock::given(method("GET"))
        .and(path(RECORDS_PATH))
        .and(query_param("name", "mc.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true, "errors": [], "result": []
        })))
        .mount(&cloudflare)
        .await;
    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .and(body_partial_json(serde_json::json!({
            "type": "A", "name": "mc.example.com", "content": "127.0.0.1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true, "errors": [], "result": {"id": "rec-1"}
        })))
        .expect(1)
        .mount(&cloudflare)
        .await;

    Mock::given(method("POST"))
        .and(path("/rcon"))
        .and(query_param("command", "list"))
        .and(header_is("x-api-key", CHANNEL_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stdout": "There are 1 of a max of 20 players online: alex",
            "stderr": "",
            "returncode": 0
        })))
        .mount(&sidecar)
        .await;

    let compute = compute(&gce);
    let dns = CloudflareDns::new("zone-1", "cf-token", Duration::from_secs(5))
        .expect("dns client")
        .with_base_url(cloudflare.uri());
    let lifecycle = LifecycleController::new(
        compute.clone(),
        id(),
        PollPolicy {
            attempts: 5,
            interval: Duration::from_millis(10),
        },
    )
    .with_dns(DnsReconciler::new(Arc::new(dns), 60), "mc.example.com");
    let relay = RelayGateway::new(
        compute,
        id(),
        channel(&sidecar),
        BearerSecret::new("operator-token").unwrap(),
    );
    let app = router(Arc::new(AppState { lifecycle, relay }));

    let (status, body) = send(app.clone(), "/start", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body,
        serde_json::json!({"status": "starting", "external_ip": "127.0.0.1", "dns_update": "created"})
    );

    let (status, body) = send(app.clone(), "/rcon?command=list", Some("operator-token")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["returncode"], 0);

    let (_, body) = send(app, "/players/count", None).await;
    assert_eq!(body["players"], 1);
}

struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[tokio::test]
async fn idle_monitor_reclaims_empty_server() {
    let gce = MockServer::start().await;
    let sidecar = MockServer::start().await;
    let state = TempDir::new().expect("tempdir");
    let marker = state.path().join("last_active");

    Mock::given(method("GET"))
        .and(path(INSTANCE_PATH))
        .respond_with(instance_body("RUNNING", Some("127.0.0.1")))
        .mount(&gce)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{INSTANCE_PATH}/stop")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "compute#operation", "status": "PENDING"
        })))
        .expect(1)
        .mount(&gce)
        .await;

    Mock::given(method("POST"))
        .and(path("/rcon"))
        .and(query_param("command", "list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stdout": "There are 0 of a max of 20 players online: ",
            "stderr": "",
            "returncode": 0
        })))
        .mount(&sidecar)
        .await;
    Mock::given(method("POST"))
        .and(path("/rcon"))
        .and(query_param("command", "stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "stdout": "Stopping the server",
            "stderr": "",
            "returncode": 0
        })))
        .expect(1)
        .mount(&sidecar)
        .await;

    let lifecycle = LifecycleController::new(
        compute(&gce),
        id(),
        PollPolicy {
            attempts: 1,
            interval: Duration::from_secs(1),
        },
    );
    let monitor = IdleMonitor::new(
        channel(&sidecar),
        lifecycle,
        Arc::new(FileActivityStore::new(marker)),
        Arc::new(WallClock),
        ProbeTarget::Instance,
        IdleSettings {
            threshold: Duration::from_millis(300),
            poll_interval: Duration::from_millis(50),
            grace: Duration::from_millis(10),
            policy: ShutdownPolicy::StopOnly,
        },
    );

    let report = tokio::time::timeout(Duration::from_secs(10), monitor.run())
        .await
        .expect("monitor finishes");

    assert!(report.graceful_stop);
    assert!(report.reclaimed);
    assert!(report.idle_for > Duration::from_millis(300));
}
