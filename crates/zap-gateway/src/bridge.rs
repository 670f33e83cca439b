use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use zap_core::{BridgeCommand, BridgeEvent, MediaKind, MessageEvent};

use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::process::BridgeProcess;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory holding the bridge sidecar (its `package.json` lives here).
    pub dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            program: "bun".to_string(),
            args: vec!["run".to_string(), "index.ts".to_string()],
            connect_timeout: Duration::from_secs(60),
            command_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug)]
struct CommandReply {
    success: bool,
    exists: Option<bool>,
    error: Option<String>,
}

type Pending = Arc<Mutex<HashMap<String, oneshot::Sender<CommandReply>>>>;

/// Production [`Gateway`]: drives the bridge sidecar process that owns the
/// actual WhatsApp session, speaking one JSON value per line over stdio.
pub struct BridgeGateway {
    config: BridgeConfig,
    process: RwLock<Option<BridgeProcess>>,
    pending: Pending,
    events_tx: broadcast::Sender<MessageEvent>,
    next_id: AtomicU64,
}

impl BridgeGateway {
    pub fn new(config: BridgeConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            process: RwLock::new(None),
            pending: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            next_id: AtomicU64::new(1),
        }
    }

    /// Ask the bridge to close its session and exit; the child is also
    /// killed on drop, this just lets it say goodbye to the service.
    pub async fn shutdown(&self) {
        let mut slot = self.process.write().await;
        if let Some(mut process) = slot.take() {
            info!("stopping bridge process");
            if let Ok(line) = serde_json::to_string(&BridgeCommand::Shutdown) {
                let _ = process.send_line(&line).await;
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            let _ = process.kill().await;
        }
    }

    fn next_command_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    async fn request(&self, id: String, command: &BridgeCommand) -> Result<CommandReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap();
            pending.insert(id.clone(), reply_tx);
        }

        let line = serde_json::to_string(command)?;
        {
            let slot = self.process.read().await;
            let process = slot.as_ref().ok_or(GatewayError::NotConnected)?;
            process.send_line(&line).await?;
        }

        match tokio::time::timeout(self.config.command_timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(GatewayError::ChannelClosed),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(GatewayError::Timeout)
            }
        }
    }

    fn spawn_event_reader(
        mut line_rx: mpsc::Receiver<String>,
        pending: Pending,
        events_tx: broadcast::Sender<MessageEvent>,
        connected_tx: oneshot::Sender<()>,
    ) {
        tokio::spawn(async move {
            let mut connected_tx = Some(connected_tx);
            while let Some(line) = line_rx.recv().await {
                let event: BridgeEvent = match serde_json::from_str(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!("unparseable bridge line ({e}): {line}");
                        continue;
                    }
                };

                match event {
                    BridgeEvent::Connected { jid } => {
                        info!(jid = jid.as_deref().unwrap_or(""), "bridge session up");
                        if let Some(tx) = connected_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                    BridgeEvent::Disconnected { reason } => {
                        warn!("bridge session dropped: {reason}");
                    }
                    BridgeEvent::Message(message) => {
                        // nobody listening is fine, ingest comes up with the daemon
                        let _ = events_tx.send(message);
                    }
                    BridgeEvent::CommandResult {
                        id,
                        success,
                        exists,
                        error,
                    } => {
                        let waiter = pending.lock().unwrap().remove(&id);
                        match waiter {
                            Some(tx) => {
                                let _ = tx.send(CommandReply {
                                    success,
                                    exists,
                                    error,
                                });
                            }
                            None => debug!("late result for command {id}"),
                        }
                    }
                    BridgeEvent::Error { error } => {
                        error!("bridge error: {error}");
                    }
                }
            }
            debug!("bridge event reader finished");
        });
    }
}

#[async_trait]
impl Gateway for BridgeGateway {
    async fn connect(&self) -> Result<()> {
        let mut slot = self.process.write().await;
        if let Some(mut stale) = slot.take() {
            let _ = stale.kill().await;
        }

        info!("starting bridge process in {}", self.config.dir.display());
        let (line_tx, line_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let process = BridgeProcess::spawn(
            &self.config.dir,
            &self.config.program,
            &self.config.args,
            line_tx,
        )
        .await?;

        let (connected_tx, connected_rx) = oneshot::channel();
        Self::spawn_event_reader(
            line_rx,
            self.pending.clone(),
            self.events_tx.clone(),
            connected_tx,
        );
        *slot = Some(process);
        drop(slot);

        if let Ok(Ok(())) = tokio::time::timeout(self.config.connect_timeout, connected_rx).await {
            return Ok(());
        }

        // never came up: reap the child before reporting failure
        let mut slot = self.process.write().await;
        if let Some(mut process) = slot.take() {
            let _ = process.kill().await;
        }
        Err(GatewayError::ConnectFailed(
            "bridge did not report a session".to_string(),
        ))
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let id = self.next_command_id();
        let command = BridgeCommand::SendText {
            id: id.clone(),
            to: to.to_string(),
            body: body.to_string(),
        };
        let reply = self.request(id, &command).await?;
        if reply.success {
            Ok(())
        } else {
            Err(GatewayError::Rejected(
                reply.error.unwrap_or_else(|| "send rejected".to_string()),
            ))
        }
    }

    async fn send_media(
        &self,
        to: &str,
        kind: MediaKind,
        mime: &str,
        path: &Path,
        caption: &str,
    ) -> Result<()> {
        let id = self.next_command_id();
        let command = BridgeCommand::SendMedia {
            id: id.clone(),
            to: to.to_string(),
            kind,
            mime: mime.to_string(),
            path: path.display().to_string(),
            caption: caption.to_string(),
        };
        let reply = self.request(id, &command).await?;
        if reply.success {
            Ok(())
        } else {
            Err(GatewayError::Rejected(
                reply.error.unwrap_or_else(|| "upload rejected".to_string()),
            ))
        }
    }

    async fn contact_exists(&self, jid: &str) -> Result<bool> {
        let id = self.next_command_id();
        let command = BridgeCommand::CheckContact {
            id: id.clone(),
            jid: jid.to_string(),
        };
        let reply = self.request(id, &command).await?;
        if !reply.success {
            return Err(GatewayError::Rejected(
                reply
                    .error
                    .unwrap_or_else(|| "contact check failed".to_string()),
            ));
        }
        reply
            .exists
            .ok_or_else(|| GatewayError::Rejected("bridge omitted the result".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.events_tx.subscribe()
    }
}
