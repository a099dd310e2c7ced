//! OAuth access tokens for Google Cloud APIs.
//!
//! Either a static token from configuration, or a token fetched from the GCE
//! metadata server and cached until shortly before it expires.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the metadata server's stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TokenError(String);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

enum Source {
    Static(String),
    Metadata {
        http: reqwest::Client,
        url: String,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

/// Shared token source for the Compute Engine and Cloud DNS adapters.
pub struct TokenSource {
    source: Source,
}

impl TokenSource {
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: Source::Static(token.into()),
        }
    }

    /// Fetch tokens from the metadata server of the VM / Cloud Run service
    /// this process runs on.
    #[must_use]
    pub fn metadata(http: reqwest::Client) -> Self {
        Self::metadata_at(http, METADATA_TOKEN_URL)
    }

    #[must_use]
    pub fn metadata_at(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            source: Source::Metadata {
                http,
                url: url.into(),
                cached: Mutex::new(None),
            },
        }
    }

    /// A currently valid access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata server cannot be reached or answers
    /// with something other than a token.
    pub async fn token(&self) -> Result<String, TokenError> {
        let (http, url, cached) = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::Metadata { http, url, cached } => (http, url, cached),
        };

        let mut slot = cached.lock().await;
        if let Some((token, valid_until)) = slot.as_ref()
            && Instant::now() < *valid_until
        {
            return Ok(token.clone());
        }

        let response = http
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| TokenError(format!("metadata server unreachable: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TokenError(format!("metadata server returned HTTP {status}")));
        }
        let body: MetadataToken = response
            .json()
            .await
            .map_err(|e| TokenError(format!("metadata token malformed: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        *slot = Some((body.access_token.clone(), Instant::now() + lifetime));
        tracing::debug!(expires_in = body.expires_in, "fetched access token from metadata server");
        Ok(body.access_token)
    }
}
