//! Compute Engine implementation of the `ComputeProvider` port.
//!
//! Talks to the `compute/v1` REST API directly. Start, stop and delete
//! return as soon as Compute Engine accepts the operation; nothing here
//! waits on the operation to finish.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::google_auth::TokenSource;
use crate::application::ports::ComputeProvider;
use crate::domain::instance::status_from_provider;
use crate::domain::{InstanceId, InstanceView, ProviderError};

const COMPUTE_API: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GceInstance {
    status: String,
    #[serde(default)]
    network_interfaces: Vec<NetworkInterface>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkInterface {
    #[serde(default)]
    access_configs: Vec<AccessConfig>,
}

#[derive(Deserialize)]
struct AccessConfig {
    #[serde(rename = "natIP")]
    nat_ip: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

/// Read the message out of a Google API error body, falling back to the raw
/// text.
pub(crate) fn google_error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorBody>(body)
        .map_or_else(|_| body.trim().to_string(), |parsed| parsed.error.message)
}

impl GceInstance {
    fn view(&self) -> Result<InstanceView, ProviderError> {
        let external_ip = self
            .network_interfaces
            .first()
            .and_then(|nic| nic.access_configs.first())
            .and_then(|ac| ac.nat_ip.as_deref())
            .map(|raw| {
                raw.parse::<Ipv4Addr>()
                    .map_err(|_| ProviderError::Malformed(format!("natIP {raw:?} is not IPv4")))
            })
            .transpose()?;
        Ok(InstanceView::new(status_from_provider(&self.status), external_ip))
    }
}

pub struct GceComputeProvider {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenSource>,
}

impl GceComputeProvider {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, tokens: Arc<TokenSource>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: COMPUTE_API.to_string(),
            tokens,
        })
    }

    /// Point the adapter at a different API root (used in tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn instance_url(&self, id: &InstanceId) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances/{}",
            self.base_url, id.project, id.zone, id.name
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| ProviderError::Credentials(e.to_string()))?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }

    async fn api_error(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::Api {
            status,
            message: google_error_message(&body),
        }
    }

    async fn post_action(&self, id: &InstanceId, action: &str) -> Result<(), ProviderError> {
        let url = format!("{}/{action}", self.instance_url(id));
        let response = self.send(self.http.post(url)).await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        tracing::debug!(instance = %id, action, "compute operation accepted");
        Ok(())
    }
}

#[async_trait]
impl ComputeProvider for GceComputeProvider {
    async fn start(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.post_action(id, "start").await
    }

    async fn stop(&self, id: &InstanceId) -> Result<(), ProviderError> {
        self.post_action(id, "stop").await
    }

    async fn delete(&self, id: &InstanceId) -> Result<(), ProviderError> {
        let response = self.send(self.http.delete(self.instance_url(id))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn get(&self, id: &InstanceId) -> Result<Option<InstanceView>, ProviderError> {
        let response = self.send(self.http.get(self.instance_url(id))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let instance: GceInstance = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        instance.view().map(Some)
    }
}
