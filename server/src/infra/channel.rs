//! HTTP implementation of the `CommandChannel` port.
//!
//! Calls the command sidecar on the instance:
//! `POST http://{host}:{port}/rcon?command=…` with an `X-API-Key` header.

use std::time::Duration;

use async_trait::async_trait;
use hibernate_common::ChannelOutput;

use crate::application::ports::CommandChannel;
use crate::domain::ChannelError;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct HttpCommandChannel {
    http: reqwest::Client,
    port: u16,
    secret: String,
}

impl HttpCommandChannel {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(port: u16, secret: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            port,
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl CommandChannel for HttpCommandChannel {
    async fn execute(&self, host: &str, command: &str) -> Result<ChannelOutput, ChannelError> {
        let url = format!("http://{host}:{}/rcon", self.port);
        let response = self
            .http
            .post(url)
            .query(&[("command", command)])
            .header(API_KEY_HEADER, &self.secret)
            .send()
            .await
            .map_err(|e| ChannelError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<ChannelOutput>()
            .await
            .map_err(|e| ChannelError::Unavailable(format!("unreadable channel reply: {e}")))
    }
}
