//! Rendering of history and live frames for the client side.

use chrono::{DateTime, Local, NaiveDate};

use zap_core::{MessageEvent, display_jid};
use zap_db::StoredMessage;

/// Calendar day of a unix timestamp, truncated in local time. Day changes
/// during replay and streaming are detected against this.
pub fn local_day(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
        .date_naive()
}

pub fn date_separator(day: NaiveDate) -> String {
    format!("── {} ──", day.format("%a, %d %b %Y"))
}

pub fn format_message(message: &StoredMessage) -> String {
    render(
        message.timestamp,
        &message.author_name,
        &message.author_jid,
        message.media_type.as_deref(),
        message.body.as_deref(),
    )
}

pub fn format_event(event: &MessageEvent) -> String {
    render(
        event.timestamp,
        &event.sender_name,
        &event.sender_jid,
        event.media_type.map(|kind| kind.as_str()),
        event.body.as_deref(),
    )
}

fn render(
    timestamp: i64,
    sender_name: &str,
    sender_jid: &str,
    media_type: Option<&str>,
    body: Option<&str>,
) -> String {
    let clock = DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
        .format("%H:%M");

    let sender = if sender_name.is_empty() {
        display_jid(sender_jid)
    } else {
        sender_name.to_string()
    };

    let content = match (media_type, body) {
        (Some(media), Some(text)) if !text.is_empty() => format!("[{media}] {text}"),
        (Some(media), _) => format!("[{media}]"),
        (None, Some(text)) => text.to_string(),
        (None, None) => String::new(),
    };

    format!("[{clock}] {sender}: {content}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_differ_across_a_two_day_gap() {
        // 48h apart, so the local dates differ in every timezone
        let a = local_day(1704110400); // 2024-01-01T12:00:00Z
        let b = local_day(1704283200); // 2024-01-03T12:00:00Z
        assert_ne!(a, b);
        assert_eq!(local_day(1704110400), a);
    }

    #[test]
    fn separator_names_the_day() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(date_separator(day), "── Tue, 02 Jan 2024 ──");
    }

    #[test]
    fn media_marker_wraps_the_caption() {
        let message = StoredMessage {
            id: 1,
            chat_id: 1,
            author_id: 1,
            external_id: "EXT-1".into(),
            kind: "media".into(),
            media_type: Some("image".into()),
            body: Some("na praia".into()),
            media_url: None,
            quoted_message_id: None,
            timestamp: 1704110400,
            author_jid: "5511999999999@s.whatsapp.net".into(),
            author_name: "Alice".into(),
        };
        let line = format_message(&message);
        assert!(line.contains("Alice: [image] na praia"), "got: {line}");
    }

    #[test]
    fn falls_back_to_jid_when_name_unknown() {
        let message = StoredMessage {
            id: 1,
            chat_id: 1,
            author_id: 1,
            external_id: "EXT-1".into(),
            kind: "text".into(),
            media_type: None,
            body: Some("oi".into()),
            media_url: None,
            quoted_message_id: None,
            timestamp: 1704110400,
            author_jid: "5511999999999@s.whatsapp.net".into(),
            author_name: String::new(),
        };
        let line = format_message(&message);
        assert!(line.contains("+5511999999999: oi"), "got: {line}");
    }
}
