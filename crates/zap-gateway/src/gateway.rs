use std::path::Path;

use async_trait::async_trait;
use tokio::sync::broadcast;

use zap_core::{MediaKind, MessageEvent};

use crate::error::Result;

/// Capability handle over the external messaging service.
///
/// The daemon supervisor and every connection handler receive this as an
/// `Arc<dyn Gateway>`; there is no ambient global client. Subscriptions are
/// plain broadcast receivers, so closing a connection drops its subscription
/// with nothing left behind on the gateway side.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Establish the session with the service. Called by the supervisor
    /// under its bounded startup retry; may be invoked again after failure.
    async fn connect(&self) -> Result<()>;

    async fn send_text(&self, to: &str, body: &str) -> Result<()>;

    async fn send_media(
        &self,
        to: &str,
        kind: MediaKind,
        mime: &str,
        path: &Path,
        caption: &str,
    ) -> Result<()>;

    async fn contact_exists(&self, jid: &str) -> Result<bool>;

    /// Live message events for all chats; callers filter by chat JID.
    fn subscribe(&self) -> broadcast::Receiver<MessageEvent>;
}
