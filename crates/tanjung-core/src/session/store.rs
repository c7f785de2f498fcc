use super::model::{Chat, ChatId, Message, SessionState};
use super::persistence::Persistence;

/// Ordered chat collection plus the active chat pointer.
///
/// Every mutation is written through to the persistence adapter right away.
/// Save failures are logged and otherwise ignored: the in-memory state stays
/// authoritative and the next mutation tries again.
pub struct SessionStore<P: Persistence> {
    state: SessionState,
    persistence: P,
}

impl<P: Persistence> SessionStore<P> {
    pub fn open(persistence: P) -> SessionStore<P> {
        let state = persistence.load();
        log::debug!(
            "Session store loaded {} chat(s), active {}",
            state.chats.len(),
            state.active_chat_id
        );
        SessionStore { state, persistence }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn chats(&self) -> &[Chat] {
        &self.state.chats
    }

    pub fn chat(&self, id: &str) -> Option<&Chat> {
        self.state.chat(id)
    }

    pub fn active_chat_id(&self) -> &str {
        &self.state.active_chat_id
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.state.chat(&self.state.active_chat_id)
    }

    pub fn create_chat(&mut self) -> ChatId {
        let id = Chat::create_id();
        self.state.chats.push(Chat::new(&id));
        self.state.active_chat_id = id.clone();
        self.persist();
        id
    }

    /// Returns false when no chat has that id.
    pub fn delete_chat(&mut self, id: &str) -> bool {
        let before = self.state.chats.len();
        self.state.chats.retain(|c| c.id != id);
        if self.state.chats.len() == before {
            return false;
        }

        if self.state.chats.is_empty() {
            self.state = SessionState::default();
        } else if self.state.active_chat_id == id {
            self.state.active_chat_id = self.state.chats[0].id.clone();
        }

        self.persist();
        true
    }

    /// Rejects unknown ids so the pointer always resolves.
    pub fn switch_active(&mut self, id: &str) -> bool {
        if self.state.chat(id).is_none() {
            return false;
        }
        self.state.active_chat_id = id.to_string();
        self.persist();
        true
    }

    /// Replaces the message sequence of a chat and recomputes its title.
    pub fn set_messages(&mut self, id: &str, messages: Vec<Message>) -> bool {
        let Some(chat) = self.state.chat_mut(id) else {
            log::warn!("Dropping messages for unknown chat {}", id);
            return false;
        };
        chat.title = Chat::derive_title(&messages);
        chat.messages = messages;
        self.persist();
        true
    }

    pub fn append_messages<I>(&mut self, id: &str, messages: I) -> bool
    where
        I: IntoIterator<Item = Message>,
    {
        let Some(chat) = self.state.chat(id) else {
            log::warn!("Dropping messages for unknown chat {}", id);
            return false;
        };
        let mut updated = chat.messages.clone();
        updated.extend(messages);
        self.set_messages(id, updated)
    }

    pub fn append_message(&mut self, id: &str, message: Message) -> bool {
        self.append_messages(id, [message])
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.state) {
            log::warn!("Failed to persist chat sessions: {}", e);
        }
    }
}
