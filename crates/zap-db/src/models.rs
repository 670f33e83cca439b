use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub jid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chat {
    pub id: i64,
    pub jid: String,
    pub name: String,
    pub is_group: bool,
}

/// A message row hydrated with its author, as needed for display.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMessage {
    pub id: i64,
    pub chat_id: i64,
    pub author_id: i64,
    pub external_id: String,
    pub kind: String,
    pub media_type: Option<String>,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub quoted_message_id: Option<i64>,
    pub timestamp: i64,
    pub author_jid: String,
    pub author_name: String,
}

/// Input to [`crate::MessageStore::insert_message`]; ids must already be
/// resolved against the contact and chat tables.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub author_id: i64,
    pub external_id: String,
    pub kind: String,
    pub media_type: Option<String>,
    pub body: Option<String>,
    pub media_url: Option<String>,
    pub quoted_message_id: Option<i64>,
    pub timestamp: i64,
}
