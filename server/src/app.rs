//! Process wiring: builds adapters from configuration and runs each of the
//! three long-lived roles (API server, idle monitor, command sidecar).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use hibernate_common::{
    ApiConfig, ChannelConfig, DnsProviderKind, InstanceConfig, MonitorConfig, SidecarConfig,
};

use crate::api::sidecar::SidecarState;
use crate::api::{self, AppState};
use crate::application::ports::{ActivityStore, CommandChannel, ComputeProvider, DnsProvider};
use crate::application::services::{
    DnsReconciler, IdleMonitor, IdleSettings, LifecycleController, PollPolicy, ProbeTarget,
    RelayGateway,
};
use crate::domain::{BearerSecret, InstanceId};
use crate::infra::activity::{FileActivityStore, NoActivityStore};
use crate::infra::channel::HttpCommandChannel;
use crate::infra::clock::SystemClock;
use crate::infra::cloud_dns::CloudDns;
use crate::infra::cloudflare::CloudflareDns;
use crate::infra::command_runner::RconRunner;
use crate::infra::config::{from_env, require_secret, resolve_secret};
use crate::infra::gce::GceComputeProvider;
use crate::infra::google_auth::TokenSource;

/// The idle monitor only stops or deletes; it never waits for RUNNING.
const MONITOR_POLL: PollPolicy = PollPolicy {
    attempts: 1,
    interval: std::time::Duration::from_secs(1),
};

// ── Adapter construction ──────────────────────────────────────────────────────

/// # Errors
///
/// Returns an error if the metadata HTTP client cannot be built.
pub fn token_source(config: &InstanceConfig) -> Result<Arc<TokenSource>> {
    let source = if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
        TokenSource::fixed(token)
    } else {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout())
            .build()
            .context("building metadata client")?;
        TokenSource::metadata(http)
    };
    Ok(Arc::new(source))
}

#[must_use]
pub fn instance_id(config: &InstanceConfig) -> InstanceId {
    InstanceId::new(&config.project, &config.zone, &config.instance)
}

/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn compute_provider(
    config: &InstanceConfig,
    tokens: Arc<TokenSource>,
) -> Result<Arc<dyn ComputeProvider>> {
    let provider = GceComputeProvider::new(config.provider_timeout(), tokens)
        .context("building compute provider client")?;
    Ok(Arc::new(provider))
}

/// The configured DNS backend, or `None` when reconciliation is disabled.
///
/// # Errors
///
/// Returns an error if a required DNS setting is missing or a client cannot
/// be built.
pub fn dns_provider(
    api: &ApiConfig,
    instance: &InstanceConfig,
    tokens: Arc<TokenSource>,
) -> Result<Option<Arc<dyn DnsProvider>>> {
    let timeout = instance.provider_timeout();
    let zone = api.dns_zone.clone().unwrap_or_default();
    let provider: Arc<dyn DnsProvider> = match api.dns_provider {
        DnsProviderKind::None => return Ok(None),
        DnsProviderKind::Cloudflare => {
            let token = require_secret(
                api.dns_token.as_deref(),
                api.dns_token_file.as_deref(),
                "DNS_TOKEN",
            )?;
            Arc::new(CloudflareDns::new(zone, token, timeout).context("building Cloudflare client")?)
        }
        DnsProviderKind::CloudDns => {
            let project = api
                .dns_project
                .clone()
                .unwrap_or_else(|| instance.project.clone());
            Arc::new(
                CloudDns::new(project, zone, tokens, timeout).context("building Cloud DNS client")?,
            )
        }
    };
    Ok(Some(provider))
}

/// # Errors
///
/// Returns an error if the channel secret is missing or the client cannot be
/// built.
pub fn command_channel(config: &ChannelConfig) -> Result<Arc<dyn CommandChannel>> {
    let secret = require_secret(
        config.channel_secret.as_deref(),
        config.channel_secret_file.as_deref(),
        "CHANNEL_SECRET",
    )?;
    let channel = HttpCommandChannel::new(config.channel_port, secret, config.channel_timeout())
        .context("building command channel client")?;
    Ok(Arc::new(channel))
}

#[must_use]
pub fn activity_store(config: &MonitorConfig) -> Arc<dyn ActivityStore> {
    match config.activity_file.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => Arc::new(FileActivityStore::new(PathBuf::from(path))),
        None => Arc::new(NoActivityStore),
    }
}

fn parse_addr(raw: &str) -> Result<SocketAddr> {
    raw.parse()
        .with_context(|| format!("invalid listen address {raw:?}"))
}

// ── Roles ─────────────────────────────────────────────────────────────────────

/// Build the API server state from configuration.
///
/// # Errors
///
/// Returns an error if configuration is missing or invalid.
pub fn api_state(
    instance: &InstanceConfig,
    channel: &ChannelConfig,
    api: &ApiConfig,
) -> Result<AppState> {
    api.validate().context("invalid API server configuration")?;

    let api_token = require_secret(
        api.api_token.as_deref(),
        api.api_token_file.as_deref(),
        "API_TOKEN",
    )?;
    let secret = BearerSecret::new(api_token).context("HIBERNATE_API_TOKEN must not be empty")?;

    let tokens = token_source(instance)?;
    let compute = compute_provider(instance, tokens.clone())?;
    let id = instance_id(instance);
    let poll = PollPolicy {
        attempts: api.start_poll_attempts,
        interval: api.start_poll_interval(),
    };

    let mut lifecycle = LifecycleController::new(compute.clone(), id.clone(), poll);
    if let (Some(provider), Some(name)) = (dns_provider(api, instance, tokens)?, &api.dns_name) {
        lifecycle = lifecycle.with_dns(DnsReconciler::new(provider, api.dns_ttl), name.clone());
    }

    let relay = RelayGateway::new(compute, id, command_channel(channel)?, secret);
    Ok(AppState { lifecycle, relay })
}

/// Run the lifecycle API until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the listener fails.
pub async fn serve() -> Result<()> {
    let instance: InstanceConfig = from_env("instance")?;
    let channel: ChannelConfig = from_env("command channel")?;
    let api: ApiConfig = from_env("API server")?;

    let state = api_state(&instance, &channel, &api)?;
    tracing::info!(
        instance = %state.lifecycle.instance(),
        listen_addr = %api.listen_addr,
        dns_provider = api.dns_provider.as_str(),
        dns_name = api.dns_name.as_deref().unwrap_or("-"),
        "configuration loaded"
    );

    let addr = parse_addr(&api.listen_addr)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "lifecycle API ready");

    axum::serve(listener, api::router(Arc::new(state)))
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .context("HTTP server error")?;
    tracing::info!("lifecycle API shut down");
    Ok(())
}

/// Run the idle monitor until it reclaims the instance.
///
/// # Errors
///
/// Returns an error if configuration is invalid. Runtime failures are
/// logged by the monitor and never end the loop.
pub async fn idle() -> Result<()> {
    let instance: InstanceConfig = from_env("instance")?;
    let channel: ChannelConfig = from_env("command channel")?;
    let monitor: MonitorConfig = from_env("idle monitor")?;
    monitor.validate().context("invalid idle monitor configuration")?;

    let tokens = token_source(&instance)?;
    let compute = compute_provider(&instance, tokens)?;
    let lifecycle = LifecycleController::new(compute, instance_id(&instance), MONITOR_POLL);
    let settings = IdleSettings {
        threshold: monitor.idle_threshold(),
        poll_interval: monitor.poll_interval(),
        grace: monitor.shutdown_grace(),
        policy: monitor.shutdown_policy,
    };

    let idle_monitor = IdleMonitor::new(
        command_channel(&channel)?,
        lifecycle,
        activity_store(&monitor),
        Arc::new(SystemClock),
        ProbeTarget::parse(&monitor.channel_host),
        settings,
    );
    let report = idle_monitor.run().await;
    tracing::info!(
        idle_secs = report.idle_for.as_secs(),
        graceful_stop = report.graceful_stop,
        reclaimed = report.reclaimed,
        "idle monitor finished"
    );
    Ok(())
}

/// Run the command sidecar until Ctrl-C / SIGTERM.
///
/// # Errors
///
/// Returns an error if no secret is configured or the listener fails.
pub async fn rcon() -> Result<()> {
    let channel: ChannelConfig = from_env("command channel")?;
    let sidecar: SidecarConfig = from_env("command sidecar")?;

    let secret = resolve_secret(
        channel.channel_secret.as_deref(),
        channel.channel_secret_file.as_deref(),
    )?
    .unwrap_or_default();
    let runner = RconRunner::new(&sidecar.rcon_program, sidecar.rcon_timeout());
    let state = SidecarState::new(runner, secret)
        .context("refusing to start: HIBERNATE_CHANNEL_SECRET or HIBERNATE_CHANNEL_SECRET_FILE must be set")?;

    let addr = parse_addr(&sidecar.sidecar_listen_addr)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, program = %sidecar.rcon_program, "command sidecar ready");

    axum::serve(listener, api::sidecar::router(Arc::new(state)))
        .with_graceful_shutdown(api::shutdown_signal())
        .await
        .context("HTTP server error")?;
    tracing::info!("command sidecar shut down");
    Ok(())
}
