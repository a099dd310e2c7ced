//! Google Cloud DNS implementation of the `DnsProvider` port.
//!
//! Cloud DNS stores one resource record set per (name, type) with a list of
//! `rrdatas`. Each address in the set is surfaced as its own `DnsRecord`, so a
//! set holding more than one address is seen as a conflict by the planner.
//! The record id is the fully qualified name.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::gce::google_error_message;
use super::google_auth::TokenSource;
use crate::application::ports::DnsProvider;
use crate::domain::dns::RECORD_TYPE;
use crate::domain::{DnsError, DnsRecord, NewRecord};

const CLOUD_DNS_API: &str = "https://dns.googleapis.com/dns/v1";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RrsetList {
    #[serde(default)]
    rrsets: Vec<Rrset>,
}

#[derive(Serialize, Deserialize)]
struct Rrset {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    #[serde(default)]
    rrdatas: Vec<String>,
}

/// Cloud DNS requires absolute names.
fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

impl From<&NewRecord> for Rrset {
    fn from(record: &NewRecord) -> Self {
        Self {
            name: fqdn(&record.name),
            record_type: RECORD_TYPE.to_string(),
            ttl: record.ttl,
            rrdatas: vec![record.content.clone()],
        }
    }
}

/// `A` record sets in one Cloud DNS managed zone.
pub struct CloudDns {
    http: reqwest::Client,
    base_url: String,
    project: String,
    managed_zone: String,
    tokens: Arc<TokenSource>,
}

impl CloudDns {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        project: impl Into<String>,
        managed_zone: impl Into<String>,
        tokens: Arc<TokenSource>,
        timeout: Duration,
    ) -> Result<Self, DnsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: CLOUD_DNS_API.to_string(),
            project: project.into(),
            managed_zone: managed_zone.into(),
            tokens,
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn rrsets_url(&self) -> String {
        format!(
            "{}/projects/{}/managedZones/{}/rrsets",
            self.base_url, self.project, self.managed_zone
        )
    }

    fn rrset_url(&self, name: &str) -> String {
        format!("{}/{}/{RECORD_TYPE}", self.rrsets_url(), fqdn(name))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DnsError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| DnsError::Transport(format!("access token: {e}")))?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(DnsError::Api {
            status,
            message: google_error_message(&body),
        })
    }
}

#[async_trait]
impl DnsProvider for CloudDns {
    async fn list_records(&self, name: &str) -> Result<Vec<DnsRecord>, DnsError> {
        let name = fqdn(name);
        let request = self
            .http
            .get(self.rrsets_url())
            .query(&[("name", name.as_str()), ("type", RECORD_TYPE)]);
        let list: RrsetList = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| DnsError::Malformed(e.to_string()))?;
        Ok(list
            .rrsets
            .into_iter()
            .filter(|set| set.record_type == RECORD_TYPE)
            .flat_map(|set| {
                let Rrset {
                    name, ttl, rrdatas, ..
                } = set;
                rrdatas.into_iter().map(move |content| DnsRecord {
                    id: name.clone(),
                    name: name.clone(),
                    content,
                    ttl,
                })
            })
            .collect())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<(), DnsError> {
        let request = self.http.post(self.rrsets_url()).json(&Rrset::from(record));
        self.send(request).await?;
        Ok(())
    }

    async fn update_record(&self, id: &str, record: &NewRecord) -> Result<(), DnsError> {
        let request = self.http.patch(self.rrset_url(id)).json(&Rrset::from(record));
        self.send(request).await?;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), DnsError> {
        match self.send(self.http.delete(self.rrset_url(id))).await {
            Err(DnsError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => Ok(()),
            other => other.map(|_| ()),
        }
    }
}
