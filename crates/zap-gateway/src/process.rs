use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::{GatewayError, Result};

/// A running bridge sidecar: stdin takes one JSON command per line, stdout
/// produces one JSON event per line, stderr goes to the log.
pub struct BridgeProcess {
    child: Child,
    stdin_tx: mpsc::Sender<String>,
}

impl BridgeProcess {
    pub async fn spawn(
        working_dir: &Path,
        program: &str,
        args: &[String],
        line_tx: mpsc::Sender<String>,
    ) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| GatewayError::SpawnFailed(e.to_string()))?;

        let stdout = child.stdout.take().ok_or(GatewayError::NotConnected)?;
        let stderr = child.stderr.take().ok_or(GatewayError::NotConnected)?;
        let mut stdin = child.stdin.take().ok_or(GatewayError::NotConnected)?;

        let (stdin_tx, mut stdin_rx) = mpsc::channel::<String>(64);

        tokio::spawn(async move {
            while let Some(line) = stdin_rx.recv().await {
                if stdin.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!("bridge stderr: {}", line);
            }
        });

        Ok(Self { child, stdin_tx })
    }

    pub async fn send_line(&self, line: &str) -> Result<()> {
        let framed = if line.ends_with('\n') {
            line.to_string()
        } else {
            format!("{line}\n")
        };

        self.stdin_tx
            .send(framed)
            .await
            .map_err(|_| GatewayError::ChannelClosed)
    }

    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(GatewayError::Io)
    }
}
