//! Chat sessions: the data model, the store and its persistence adapters.

pub mod model;
pub mod persistence;
pub mod store;

pub use model::{Chat, ChatId, Message, Role, SessionState, BOOTSTRAP_CHAT_ID};
pub use persistence::{JsonFilePersistence, MemoryPersistence, Persistence};
pub use store::SessionStore;
