//! Core library for the Tanjung AI chat assistant.
//!
//! The crate is split along the two halves of the application:
//!
//! - **Proxy**: [`proxy::ProxyService`] validates an incoming generate request,
//!   resolves the provider credential, forwards the prompt (and any images) to a
//!   [`llm::Generator`] and normalizes the reply into plain text.
//! - **Chat client**: [`session::SessionStore`] keeps the ordered chats and the
//!   active chat pointer, [`composer::Composer`] holds the input surface,
//!   [`typewriter::Typewriter`] reveals replies one character at a time, and
//!   [`controller::ChatController`] ties them to a [`client::ProxyClient`].

pub mod client;
pub mod composer;
pub mod config;
pub mod controller;
pub mod errors;
pub mod llm;
pub mod proxy;
pub mod session;
pub mod typewriter;

pub use client::{HttpProxyClient, ProxyClient, ProxyRequest};
pub use config::{ConfigLoader, GenerationConfig, TanjungConfig};
pub use controller::{ChatController, SendOutcome, TickOutcome};
pub use errors::{ClientError, ConfigError, ProxyError, StoreError};
pub use proxy::{CredentialSource, GenerateRequest, GenerateResponse, ProxyService};
pub use session::{JsonFilePersistence, MemoryPersistence, Persistence, SessionStore};
pub use typewriter::{ManualScheduler, Scheduler, TokioScheduler, Typewriter};

#[cfg(test)]
pub mod test_utils;
