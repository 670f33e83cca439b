//! Persists everything the gateway sees, independent of any client.
//!
//! History replay can only serve what this loop has stored: for every live
//! message event it upserts the author and the chat, resolves the quoted
//! message if we have it, and inserts the message keyed by its external id,
//! so re-deliveries collapse into the row stored the first time.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use zap_core::MessageEvent;
use zap_db::{MessageStore, NewMessage, StoreError};
use zap_gateway::Gateway;

pub fn spawn_ingest(
    store: Arc<MessageStore>,
    gateway: Arc<dyn Gateway>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut events = gateway.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Err(e) = persist_event(&store, &event).await {
                            // one bad event must not take the loop down
                            warn!(external_id = %event.external_id, "failed to persist message: {e}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("ingest lagged, {missed} events not persisted");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        debug!("ingest loop stopped");
    })
}

pub async fn persist_event(
    store: &MessageStore,
    event: &MessageEvent,
) -> Result<i64, StoreError> {
    let author_id = store
        .upsert_contact(&event.sender_jid, &event.sender_name)
        .await?;
    let chat_id = store
        .upsert_chat(&event.chat_jid, &event.chat_name, event.is_group)
        .await?;

    // quoted ids only count when the quoted row is actually ours
    let quoted_message_id = match &event.quoted_external_id {
        Some(external) => store.message_id_by_external(external).await?,
        None => None,
    };

    store
        .insert_message(&NewMessage {
            chat_id,
            author_id,
            external_id: event.external_id.clone(),
            kind: event.kind.as_str().to_string(),
            media_type: event.media_type.map(|kind| kind.as_str().to_string()),
            body: event.body.clone(),
            media_url: event.media_url.clone(),
            quoted_message_id,
            timestamp: event.timestamp,
        })
        .await
}
