//! Owns the listening socket and the gateway lifecycle.
//!
//! The listener comes up first, so clients always get an answer: until the
//! gateway session is established every command is refused with a degraded
//! response instead of being queued. The gateway gets a fixed number of
//! connect attempts; running out of them is fatal for the whole daemon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use zap_db::MessageStore;
use zap_gateway::Gateway;

use crate::config::DaemonConfig;
use crate::connection::{ConnectionCtx, handle_connection};
use crate::error::{DaemonError, Result};
use crate::ingest;

pub struct Supervisor {
    config: DaemonConfig,
    store: Arc<MessageStore>,
    gateway: Arc<dyn Gateway>,
    shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(
        config: DaemonConfig,
        store: Arc<MessageStore>,
        gateway: Arc<dyn Gateway>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            store,
            gateway,
            shutdown,
        }
    }

    /// Serve until the shutdown token fires. Returns an error only for a
    /// failed bind or an unreachable gateway; both are fatal to the process.
    pub async fn run(&self) -> Result<()> {
        let socket_path = self.config.socket_path.clone();
        let listener = bind_socket(&socket_path)?;
        info!("listening on {}", socket_path.display());

        let (ready_tx, ready_rx) = watch::channel(false);
        let ctx = ConnectionCtx {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            ready: ready_rx,
            shutdown: self.shutdown.clone(),
        };
        let accept = tokio::spawn(accept_loop(listener, ctx, self.shutdown.clone()));

        let connected = tokio::select! {
            _ = self.shutdown.cancelled() => Ok(false),
            result = self.connect_with_retry() => result.map(|()| true),
        };

        match connected {
            Ok(true) => {
                let _ = ready_tx.send(true);
                info!("gateway connected, serving commands");

                let ingest = ingest::spawn_ingest(
                    self.store.clone(),
                    self.gateway.clone(),
                    self.shutdown.clone(),
                );

                self.shutdown.cancelled().await;
                let _ = ingest.await;
            }
            Ok(false) => {} // shut down while still connecting
            Err(e) => {
                self.shutdown.cancel();
                let _ = accept.await;
                remove_socket(&socket_path);
                return Err(e);
            }
        }

        let _ = accept.await;
        remove_socket(&socket_path);
        info!("daemon stopped");
        Ok(())
    }

    async fn connect_with_retry(&self) -> Result<()> {
        for attempt in 1..=self.config.connect_attempts {
            match self.gateway.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(
                    attempt,
                    max = self.config.connect_attempts,
                    "gateway connect failed: {e}"
                ),
            }
        }
        Err(DaemonError::GatewayUnreachable {
            attempts: self.config.connect_attempts,
        })
    }
}

fn bind_socket(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        warn!("removing stale socket {}", path.display());
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(UnixListener::bind(path)?)
}

fn remove_socket(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("could not remove socket {}: {e}", path.display());
    }
}

async fn accept_loop(listener: UnixListener, ctx: ConnectionCtx, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    // each connection runs on its own task; accepting never waits
                    tokio::spawn(handle_connection(stream, ctx.clone()));
                }
                Err(e) => {
                    error!("accept error: {e}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}
