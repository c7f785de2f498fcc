//! Plain-text rendering of chats for the terminal.

use tanjung_core::composer::{Attachment, PRESET_QUESTIONS};
use tanjung_core::session::{Chat, Message, Role};

pub const ASSISTANT_PREFIX: &str = "tanjung> ";
pub const USER_PREFIX: &str = "you> ";

pub fn message_line(index: usize, message: &Message, copied: bool) -> String {
    let prefix = match message.role {
        Role::User => USER_PREFIX,
        Role::Assistant => ASSISTANT_PREFIX,
    };
    let mut line = format!("[{}] {}{}", index + 1, prefix, message.text);
    for image in &message.images {
        line.push_str(&format!("\n      [image] {}", image));
    }
    if copied {
        line.push_str("  (disalin)");
    }
    line
}

pub fn transcript(chat: &Chat, copied: Option<usize>) -> String {
    if chat.messages.is_empty() {
        return format!("-- {} (kosong) --", chat.title);
    }
    let mut out = format!("-- {} --", chat.title);
    for (i, message) in chat.messages.iter().enumerate() {
        out.push('\n');
        out.push_str(&message_line(i, message, copied == Some(i)));
    }
    out
}

pub fn chat_list(chats: &[Chat], active_id: &str) -> String {
    chats
        .iter()
        .enumerate()
        .map(|(i, chat)| {
            let marker = if chat.id == active_id { '*' } else { ' ' };
            format!(
                "{} {}. {} ({} pesan) [{}]",
                marker,
                i + 1,
                chat.title,
                chat.messages.len(),
                chat.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn presets() -> String {
    PRESET_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| format!("  /p {}  {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn attachments(pending: &[Attachment]) -> String {
    pending
        .iter()
        .enumerate()
        .map(|(i, a)| format!("  {}. {} ({})", i + 1, a.preview, a.mime_type))
        .collect::<Vec<_>>()
        .join("\n")
}
