pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contact (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    jid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS chat (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    jid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    is_group INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS message (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    external_id TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL DEFAULT 'text',
    media_type TEXT,
    body TEXT,
    media_url TEXT,
    quoted_message_id INTEGER,
    timestamp INTEGER NOT NULL,
    FOREIGN KEY (chat_id) REFERENCES chat(id),
    FOREIGN KEY (author_id) REFERENCES contact(id),
    FOREIGN KEY (quoted_message_id) REFERENCES message(id)
);

CREATE INDEX IF NOT EXISTS idx_message_chat_timestamp ON message(chat_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_message_external ON message(external_id);
"#;
