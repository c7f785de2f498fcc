use serde::{Deserialize, Serialize};

pub const BOOTSTRAP_CHAT_ID: &str = "default";
pub const BOOTSTRAP_CHAT_TITLE: &str = "Obrolan Pertama";
pub const NEW_CHAT_TITLE: &str = "Obrolan Baru";
pub const TITLE_MAX_CHARS: usize = 20;

pub type ChatId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Preview references of the images sent with the message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing: Option<bool>,
}

impl Message {
    pub fn user(text: &str, images: Vec<String>) -> Message {
        Message {
            role: Role::User,
            text: text.to_string(),
            images,
            typing: None,
        }
    }

    pub fn assistant(text: &str) -> Message {
        Message {
            role: Role::Assistant,
            text: text.to_string(),
            images: vec![],
            typing: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub messages: Vec<Message>,
    pub title: String,
}

impl Chat {
    pub fn new(id: &str) -> Chat {
        Chat {
            id: id.to_string(),
            messages: vec![],
            title: NEW_CHAT_TITLE.to_string(),
        }
    }

    pub fn bootstrap() -> Chat {
        Chat {
            id: BOOTSTRAP_CHAT_ID.to_string(),
            messages: vec![],
            title: BOOTSTRAP_CHAT_TITLE.to_string(),
        }
    }

    pub fn create_id() -> ChatId {
        uuid::Uuid::new_v4().to_string()
    }

    /// Leading characters of the first message, or the placeholder.
    pub fn derive_title(messages: &[Message]) -> String {
        let title: String = messages
            .first()
            .map(|m| m.text.chars().take(TITLE_MAX_CHARS).collect())
            .unwrap_or_default();

        if title.is_empty() {
            NEW_CHAT_TITLE.to_string()
        } else {
            title
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub chats: Vec<Chat>,
    pub active_chat_id: ChatId,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            chats: vec![Chat::bootstrap()],
            active_chat_id: BOOTSTRAP_CHAT_ID.to_string(),
        }
    }
}

impl SessionState {
    /// Builds a state from whatever was stored, restoring the invariant that
    /// the active id resolves to an existing chat.
    pub fn rehydrate(chats: Vec<Chat>, active_chat_id: Option<ChatId>) -> SessionState {
        if chats.is_empty() {
            return SessionState::default();
        }

        let active_chat_id = match active_chat_id {
            Some(id) if chats.iter().any(|c| c.id == id) => id,
            _ => chats[0].id.clone(),
        };

        SessionState {
            chats,
            active_chat_id,
        }
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn chat_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == id)
    }
}
