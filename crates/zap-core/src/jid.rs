//! Helpers for building and displaying WhatsApp JIDs.

pub const USER_SERVER: &str = "s.whatsapp.net";
pub const GROUP_SERVER: &str = "g.us";

/// Address a user by phone number: `5511999999999` → `5511999999999@s.whatsapp.net`.
pub fn user_jid(phone: &str) -> String {
    let digits = phone.trim().trim_start_matches('+');
    format!("{digits}@{USER_SERVER}")
}

pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SERVER)
}

/// Human-friendly rendering of a JID: phone JIDs become `+<number>`,
/// everything else stays as-is (group ids carry no useful local part).
pub fn display_jid(jid: &str) -> String {
    if let Some((user, server)) = jid.split_once('@')
        && server == USER_SERVER
        && !user.is_empty()
        && user.chars().all(|c| c.is_ascii_digit())
    {
        return format!("+{user}");
    }
    jid.to_string()
}
