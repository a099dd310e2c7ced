//! Infrastructure implementations of the `ActivityStore` port.
//!
//! `FileActivityStore` persists the last-active marker as a single integer
//! (unix seconds) using `tokio::task::spawn_blocking` and an atomic write
//! (temp file + rename), so a crash mid-write never leaves a torn marker.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::application::ports::ActivityStore;

pub struct FileActivityStore {
    path: PathBuf,
}

impl FileActivityStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_sync(&self) -> Result<Option<i64>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading activity marker {}", self.path.display()))?;
        let value = content
            .trim()
            .parse::<i64>()
            .with_context(|| format!("parsing activity marker {}", self.path.display()))?;
        Ok(Some(value))
    }

    fn save_sync(&self, unix_secs: i64) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, unix_secs.to_string())
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing activity marker {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FileActivityStore {
    async fn load(&self) -> Result<Option<i64>> {
        let store = Self::new(self.path.clone());
        tokio::task::spawn_blocking(move || store.load_sync())
            .await
            .context("activity load task panicked")?
    }

    async fn save(&self, unix_secs: i64) -> Result<()> {
        let store = Self::new(self.path.clone());
        tokio::task::spawn_blocking(move || store.save_sync(unix_secs))
            .await
            .context("activity save task panicked")?
    }
}

/// No persistence: every monitor start is a cold start.
pub struct NoActivityStore;

#[async_trait]
impl ActivityStore for NoActivityStore {
    async fn load(&self) -> Result<Option<i64>> {
        Ok(None)
    }

    async fn save(&self, _unix_secs: i64) -> Result<()> {
        Ok(())
    }
}
