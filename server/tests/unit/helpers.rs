//! Router construction and request helpers for API tests.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use hibernate::api::{AppState, router};
use hibernate::application::services::{
    DnsReconciler, LifecycleController, PollPolicy, RelayGateway,
};
use hibernate::domain::{BearerSecret, InstanceId};
use tower::ServiceExt;

use super::mocks::{StubChannel, StubCompute, StubDns};

pub const TOKEN: &str = "operator-token";
pub const BEARER: &str = "Bearer operator-token";
pub const DNS_NAME: &str = "mc.example.com";

pub fn instance() -> InstanceId {
    InstanceId::new("proj", "europe-west1-b", "mc")
}

pub fn poll() -> PollPolicy {
    PollPolicy {
        attempts: 3,
        interval: Duration::from_millis(1),
    }
}

pub struct Harness {
    pub compute: Arc<StubCompute>,
    pub channel: Arc<StubChannel>,
    pub dns: Option<Arc<StubDns>>,
}

impl Harness {
    pub fn new(compute: StubCompute, channel: StubChannel) -> Self {
        Self {
            compute: Arc::new(compute),
            channel: Arc::new(channel),
            dns: None,
        }
    }

    pub fn with_dns(mut self) -> Self {
        self.dns = Some(Arc::new(StubDns::default()));
        self
    }

    pub fn router(&self) -> Router {
        let mut lifecycle = LifecycleController::new(self.compute.clone(), instance(), poll());
        if let Some(dns) = &self.dns {
            lifecycle = lifecycle.with_dns(DnsReconciler::new(dns.clone(), 60), DNS_NAME);
        }
        let relay = RelayGateway::new(
            self.compute.clone(),
            instance(),
            self.channel.clone(),
            BearerSecret::new(TOKEN).unwrap(),
        );
        router(Arc::new(AppState { lifecycle, relay }))
    }
}

/// Send a request and decode the body as JSON (`Null` for an empty body).
pub async fn call(
    app: Router,
    method: &str,
    uri: &str,
    authorization: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let response = app
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    call(app, "GET", uri, None).await
}
