use serde::{Deserialize, Serialize};

/// Broad shape of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Media,
    Other,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Media => "media",
            MessageKind::Other => "other",
        }
    }
}

/// The four upload paths the service distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }
}

/// One message delivery observed by the gateway, fanned out to subscribers
/// and persisted by the daemon's ingest loop.
///
/// `external_id` is the service's own unique id for the event and is the
/// deduplication key everywhere downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub external_id: String,
    pub chat_jid: String,
    #[serde(default)]
    pub chat_name: String,
    pub sender_jid: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_from_me: bool,
    pub kind: MessageKind,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub quoted_external_id: Option<String>,
    pub timestamp: i64,
}

/// Commands written to the bridge sidecar's stdin, one JSON line each.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeCommand {
    SendText {
        id: String,
        to: String,
        body: String,
    },
    SendMedia {
        id: String,
        to: String,
        kind: MediaKind,
        mime: String,
        path: String,
        caption: String,
    },
    CheckContact {
        id: String,
        jid: String,
    },
    Shutdown,
}

/// Events read from the bridge sidecar's stdout.
///
/// Deliberately a closed tagged union so every consumer matches
/// exhaustively; new bridge event types are a compile error, not a silently
/// ignored payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    Connected {
        #[serde(default)]
        jid: Option<String>,
    },
    Disconnected {
        reason: String,
    },
    Message(MessageEvent),
    CommandResult {
        id: String,
        success: bool,
        #[serde(default)]
        exists: Option<bool>,
        #[serde(default)]
        error: Option<String>,
    },
    Error {
        error: String,
    },
}
