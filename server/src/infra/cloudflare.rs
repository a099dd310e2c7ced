//! Cloudflare implementation of the `DnsProvider` port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::DnsProvider;
use crate::domain::dns::RECORD_TYPE;
use crate::domain::{DnsError, DnsRecord, NewRecord};

const CLOUDFLARE_API: &str = "https://api.cloudflare.com/client/v4";

/// Every Cloudflare v4 response is wrapped in this envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CloudflareMessage>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct CloudflareMessage {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct CloudflareRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    ttl: u32,
}

#[derive(Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl<'a> From<&'a NewRecord> for RecordBody<'a> {
    fn from(record: &'a NewRecord) -> Self {
        Self {
            record_type: RECORD_TYPE,
            name: &record.name,
            content: &record.content,
            ttl: record.ttl,
            // Game traffic is not HTTP; the record must resolve to the VM.
            proxied: false,
        }
    }
}

fn describe(errors: &[CloudflareMessage]) -> String {
    if errors.is_empty() {
        return "request not successful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// DNS records in one Cloudflare zone.
pub struct CloudflareDns {
    http: reqwest::Client,
    base_url: String,
    zone_id: String,
    token: String,
}

impl CloudflareDns {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        zone_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DnsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: CLOUDFLARE_API.to_string(),
            zone_id: zone_id.into(),
            token: token.into(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, DnsError> {
        let response: Response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            if (200..300).contains(&status) {
                DnsError::Malformed(e.to_string())
            } else {
                DnsError::Api {
                    status,
                    message: text.trim().to_string(),
                }
            }
        })?;
        if !envelope.success || !(200..300).contains(&status) {
            return Err(DnsError::Api {
                status,
                message: describe(&envelope.errors),
            });
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    async fn list_records(&self, name: &str) -> Result<Vec<DnsRecord>, DnsError> {
        let request = self
            .http
            .get(self.records_url())
            .query(&[("type", RECORD_TYPE), ("name", name)]);
        let records: Vec<CloudflareRecord> = self.call(request).await?.unwrap_or_default();
        Ok(records
            .into_iter()
            .filter(|r| r.record_type == RECORD_TYPE)
            .map(|r| DnsRecord {
                id: r.id,
                name: r.name,
                content: r.content,
                ttl: r.ttl,
            })
            .collect())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<(), DnsError> {
        let request = self
            .http
            .post(self.records_url())
            .json(&RecordBody::from(record));
        self.call::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn update_record(&self, id: &str, record: &NewRecord) -> Result<(), DnsError> {
        let request = self
            .http
            .put(format!("{}/{id}", self.records_url()))
            .json(&RecordBody::from(record));
        self.call::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), DnsError> {
        let request = self.http.delete(format!("{}/{id}", self.records_url()));
        self.call::<serde_json::Value>(request).await?;
        Ok(())
    }
}
