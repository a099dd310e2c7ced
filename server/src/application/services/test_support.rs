//! Shared stubs for the service tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use hibernate_common::{ChannelOutput, InstanceStatus};

use crate::application::ports::{ActivityStore, Clock, CommandChannel, ComputeProvider, DnsProvider};
use crate::domain::{
    ChannelError, DnsError, DnsRecord, InstanceId, InstanceView, NewRecord, ProviderError,
};

pub fn instance() -> InstanceId {
    InstanceId::new("proj", "europe-west1-b", "mc")
}

pub fn running(ip: [u8; 4]) -> Option<InstanceView> {
    Some(InstanceView::new(
        InstanceStatus::Running,
        Some(Ipv4Addr::from(ip)),
    ))
}

pub fn with_status(status: InstanceStatus) -> Option<InstanceView> {
    Some(InstanceView::new(status, None))
}

// ── Compute ───────────────────────────────────────────────────────────────────

/// Returns scripted `get` results in order; the last one repeats.
pub struct ScriptedCompute {
    views: Mutex<VecDeque<Option<InstanceView>>>,
    start_error: Option<ProviderError>,
    gets: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
    deletes: AtomicUsize,
}

impl ScriptedCompute {
    pub fn new(views: impl IntoIterator<Item = Option<InstanceView>>) -> Self {
        Self {
            views: Mutex::new(views.into_iter().collect()),
            start_error: None,
            gets: AtomicUsize::new(0),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn failing_start(mut self, err: ProviderError) -> Self {
        self.start_error = Some(err);
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeProvider for ScriptedCompute {
    async fn start(&self, _: &InstanceId) -> Result<(), ProviderError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match &self.start_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn stop(&self, _: &InstanceId) -> Result<(), ProviderError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, _: &InstanceId) -> Result<(), ProviderError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, _: &InstanceId) -> Result<Option<InstanceView>, ProviderError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let mut views = self.views.lock().unwrap();
        let view = if views.len() > 1 {
            views.pop_front().flatten()
        } else {
            views.front().copied().flatten()
        };
        Ok(view)
    }
}

// ── DNS ───────────────────────────────────────────────────────────────────────

/// In-memory zone holding `A` records.
pub struct MemoryDns {
    records: Mutex<Vec<DnsRecord>>,
    next_id: AtomicUsize,
    update_supported: bool,
    failing: bool,
    writes: AtomicUsize,
    deletes: AtomicUsize,
    lists: AtomicUsize,
}

impl Default for MemoryDns {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            update_supported: true,
            failing: false,
            writes: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        }
    }
}

impl MemoryDns {
    pub fn with_record(name: &str, content: &str) -> Self {
        let dns = Self::default();
        dns.insert(name, content);
        dns
    }

    pub fn insert(&self, name: &str, content: &str) {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(DnsRecord {
            id,
            name: name.to_string(),
            content: content.to_string(),
            ttl: 60,
        });
    }

    pub fn without_update(mut self) -> Self {
        self.update_supported = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), DnsError> {
        if self.failing {
            return Err(DnsError::Api {
                status: 403,
                message: "token lacks DNS edit permission".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MemoryDns {
    async fn list_records(&self, name: &str) -> Result<Vec<DnsRecord>, DnsError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.name == name)
            .cloned()
            .collect())
    }

    async fn create_record(&self, record: &NewRecord) -> Result<(), DnsError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(DnsRecord {
            id,
            name: record.name.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
        });
        Ok(())
    }

    async fn update_record(&self, id: &str, record: &NewRecord) -> Result<(), DnsError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| DnsError::Api {
                status: 404,
                message: format!("record {id} not found"),
            })?;
        existing.content.clone_from(&record.content);
        existing.ttl = record.ttl;
        Ok(())
    }

    async fn delete_record(&self, id: &str) -> Result<(), DnsError> {
        self.check()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    fn supports_update(&self) -> bool {
        self.update_supported
    }
}

// ── Command channel ───────────────────────────────────────────────────────────

type Reply = Box<dyn Fn(&str) -> Result<ChannelOutput, ChannelError> + Send + Sync>;

/// A command executed through [`ScriptedChannel`].
#[derive(Debug, Clone)]
pub struct ChannelCall {
    pub host: String,
    pub command: String,
    pub at: tokio::time::Instant,
}

/// Answers each command with a closure and records every call.
pub struct ScriptedChannel {
    reply: Reply,
    calls: Mutex<Vec<ChannelCall>>,
}

impl ScriptedChannel {
    pub fn new(
        reply: impl Fn(&str) -> Result<ChannelOutput, ChannelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reply: Box::new(reply),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self, command: &str) -> Vec<ChannelCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == command)
            .collect()
    }
}

#[async_trait]
impl CommandChannel for ScriptedChannel {
    async fn execute(&self, host: &str, command: &str) -> Result<ChannelOutput, ChannelError> {
        self.calls.lock().unwrap().push(ChannelCall {
            host: host.to_string(),
            command: command.to_string(),
            at: tokio::time::Instant::now(),
        });
        (self.reply)(command)
    }
}

pub fn output(stdout: &str) -> ChannelOutput {
    ChannelOutput {
        stdout: stdout.to_string(),
        stderr: String::new(),
        returncode: 0,
    }
}

pub fn list_reply(players: u32) -> Result<ChannelOutput, ChannelError> {
    Ok(output(&format!(
        "There are {players} of a max of 20 players online:"
    )))
}

// ── Clock and store ───────────────────────────────────────────────────────────

/// Wall clock driven by tokio's (pausable) clock.
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        self.base + TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::zero())
    }
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

#[derive(Default)]
pub struct MemoryActivityStore {
    value: Mutex<Option<i64>>,
    saves: AtomicUsize,
}

impl MemoryActivityStore {
    pub fn holding(unix_secs: i64) -> Self {
        Self {
            value: Mutex::new(Some(unix_secs)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn value(&self) -> Option<i64> {
        *self.value.lock().unwrap()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(self.value())
    }

    async fn save(&self, unix_secs: i64) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.value.lock().unwrap() = Some(unix_secs);
        Ok(())
    }
}
