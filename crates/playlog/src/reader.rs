//! Supervision of the external snapshot producer (a memory reader such as
//! tosu or gosumemory).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::ReaderConfig;

pub struct ReaderProcess {
    child: Child,
    path: PathBuf,
}

impl ReaderProcess {
    /// Launch the configured reader in its own directory.
    ///
    /// Returns `Ok(None)` when the executable does not exist; the tracker
    /// still connects in case the reader was started some other way.
    pub fn spawn(config: &ReaderConfig) -> Result<Option<Self>> {
        if !config.path.exists() {
            warn!(
                path = %config.path.display(),
                "Snapshot reader not found, connecting without it"
            );
            return Ok(None);
        }

        let working_dir = config
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        debug!(
            path = %config.path.display(),
            args = ?config.args,
            working_dir = %working_dir.display(),
            "Spawning snapshot reader"
        );

        let mut child = Command::new(&config.path)
            .args(&config.args)
            .current_dir(working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", config.path.display()))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, "stderr"));
        }

        Ok(Some(Self {
            child,
            path: config.path.clone(),
        }))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run until the reader exits on its own or shutdown is signalled, in
    /// which case it is killed. Returns the exit code, if any.
    pub async fn supervise(mut self, mut shutdown: watch::Receiver<bool>) -> Result<Option<i32>> {
        let status = tokio::select! {
            status = self.child.wait() => {
                let status = status.context("Failed to wait for snapshot reader")?;
                warn!(code = ?status.code(), "Snapshot reader exited");
                status
            }
            _ = shutdown_requested(&mut shutdown) => {
                debug!(path = %self.path.display(), "Stopping snapshot reader");
                self.child.kill().await.context("Failed to kill snapshot reader")?;
                self.child.wait().await.context("Failed to wait for snapshot reader")?
            }
        };
        Ok(status.code())
    }
}

/// Resolves once `shutdown` is true or its sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn forward_lines<R: AsyncRead + Unpin>(reader: R, stream: &'static str) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(stream, line = %line, "reader");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_reader_is_skipped() {
        let config = ReaderConfig {
            path: PathBuf::from("/definitely/not/here/tosu"),
            args: Vec::new(),
            startup_delay: Duration::from_secs(3),
        };
        assert!(ReaderProcess::spawn(&config).unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reader_killed_on_shutdown() {
        let config = ReaderConfig {
            path: PathBuf::from("/bin/sleep"),
            args: vec!["30".to_string()],
            startup_delay: Duration::ZERO,
        };
        let reader = ReaderProcess::spawn(&config).unwrap().unwrap();
        assert!(reader.id().is_some());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(reader.supervise(rx));
        tx.send(true).unwrap();

        let code = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(code.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reader_exit_is_reported() {
        let config = ReaderConfig {
            path: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), "echo ready; exit 3".to_string()],
            startup_delay: Duration::ZERO,
        };
        let reader = ReaderProcess::spawn(&config).unwrap().unwrap();

        let (_tx, rx) = watch::channel(false);
        let code = reader.supervise(rx).await.unwrap();
        assert_eq!(code, Some(3));
    }

    #[tokio::test]
    async fn test_shutdown_requested_on_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(&mut rx))
            .await
            .unwrap();
    }
}
