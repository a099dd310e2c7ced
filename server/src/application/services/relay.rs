//! Command relay gateway: bearer check, address lookup, forward.
//!
//! The gateway performs no command validation of its own. The command
//! channel on the instance is the trust boundary for command semantics.

use std::net::Ipv4Addr;
use std::sync::Arc;

use hibernate_common::ChannelOutput;

use crate::application::ports::{CommandChannel, ComputeProvider};
use crate::domain::occupancy::LIST_COMMAND;
use crate::domain::{BearerSecret, InstanceId, Occupancy, RelayError};

/// Stateless per call; cheap to clone into handlers.
#[derive(Clone)]
pub struct RelayGateway {
    compute: Arc<dyn ComputeProvider>,
    instance: InstanceId,
    channel: Arc<dyn CommandChannel>,
    secret: BearerSecret,
}

impl RelayGateway {
    #[must_use]
    pub fn new(
        compute: Arc<dyn ComputeProvider>,
        instance: InstanceId,
        channel: Arc<dyn CommandChannel>,
        secret: BearerSecret,
    ) -> Self {
        Self {
            compute,
            instance,
            channel,
            secret,
        }
    }

    /// Check an `Authorization` header against the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` unless the header is `Bearer <secret>` exactly.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<(), RelayError> {
        if self.secret.verify(authorization) {
            Ok(())
        } else {
            tracing::warn!("rejected command relay request: bad or missing bearer credential");
            Err(RelayError::Unauthorized)
        }
    }

    /// Forward `command` verbatim to the instance's command channel.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `InstanceUnreachable`, `RelayFailed`,
    /// `ChannelUnavailable` or `Provider`.
    pub async fn relay(
        &self,
        command: &str,
        authorization: Option<&str>,
    ) -> Result<ChannelOutput, RelayError> {
        self.authorize(authorization)?;
        tracing::info!(command, "relaying command");
        self.forward(command).await
    }

    /// Ask the game server who is connected. Discloses no control
    /// capability, so no credential is required.
    ///
    /// # Errors
    ///
    /// Same as [`relay`](Self::relay) minus `Unauthorized`.
    pub async fn player_count(&self) -> Result<(Occupancy, ChannelOutput), RelayError> {
        let output = self.forward(LIST_COMMAND).await?;
        Ok((Occupancy::parse(&output.stdout), output))
    }

    async fn forward(&self, command: &str) -> Result<ChannelOutput, RelayError> {
        let address = self.resolve().await?;
        let output = self
            .channel
            .execute(&address.to_string(), command)
            .await
            .inspect_err(|err| tracing::warn!(%address, error = %err, "command channel call failed"))?;
        Ok(output)
    }

    async fn resolve(&self) -> Result<Ipv4Addr, RelayError> {
        self.compute
            .get(&self.instance)
            .await?
            .and_then(|view| view.reachable_ip())
            .ok_or(RelayError::InstanceUnreachable)
    }
}
