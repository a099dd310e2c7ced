//! Runs the game server's RCON client for the command sidecar.
//!
//! `RconRunner` executes `<program> <command>` with tokio, captures both
//! streams and kills the child if it outlives the timeout. The command is
//! passed as a single argument; no shell is involved.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use hibernate_common::ChannelOutput;
use tokio::io::AsyncReadExt;

/// Exit code reported when the child was terminated by a signal.
const SIGNALLED_RETURNCODE: i32 = -1;

pub struct RconRunner {
    program: String,
    timeout: Duration,
}

impl RconRunner {
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run one command to completion.
    ///
    /// A non-zero exit is not an error; it is reported in `returncode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or does not finish
    /// within the timeout (the child is killed in that case).
    pub async fn run(&self, command: &str) -> Result<ChannelOutput> {
        let program = self.program.as_str();
        let mut child = tokio::process::Command::new(program)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let mut stdout_handle = child.stdout.take();
        let mut stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stdout_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                    async {
                        let mut buf = Vec::new();
                        if let Some(ref mut h) = stderr_handle {
                            let _ = h.read_to_end(&mut buf).await;
                        }
                        buf
                    },
                );
                let status = status.with_context(|| format!("waiting for {program}"))?;
                Ok(ChannelOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&stderr).into_owned(),
                    returncode: status.code().unwrap_or(SIGNALLED_RETURNCODE),
                })
            } => result,
            () = tokio::time::sleep(self.timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", self.timeout.as_secs())
            }
        }
    }
}
