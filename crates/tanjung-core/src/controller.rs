//! The chat send flow.
//!
//! `ChatController` owns the session store, the composer and the typewriter,
//! and is driven from a single task: the front-end calls [`ChatController::send`]
//! and feeds reveal ticks back through [`ChatController::next_tick`] /
//! [`ChatController::on_tick`].

use crate::client::{ProxyClient, ProxyRequest};
use crate::composer::{Composer, PRESET_QUESTIONS};
use crate::errors::ClientError;
use crate::session::{ChatId, Message, Persistence, SessionStore};
use crate::typewriter::{Reveal, RevealStep, Scheduler, Typewriter, REVEAL_PERIOD};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const EMPTY_REPLY_TEXT: &str = "Saya belum bisa menjawab itu.";
pub const SERVER_ERROR_TEXT: &str = "Terjadi kesalahan server.";
pub const PROCESSING_ERROR_TEXT: &str = "Terjadi kesalahan saat memproses jawaban.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// A previous send is still in flight.
    Busy,
    NothingToSend,
    /// The reply is being revealed into `chat_id`.
    Revealing { chat_id: ChatId, generation: u64 },
    /// The request failed; an error message was appended directly.
    Failed { chat_id: ChatId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Stale,
    Progress(char),
    Committed { last: Option<char>, chat_id: ChatId },
}

pub struct ChatController<P: Persistence, C: ProxyClient> {
    store: SessionStore<P>,
    composer: Composer,
    typewriter: Typewriter,
    client: C,
    scheduler: Arc<dyn Scheduler>,
    reveal_token: Option<CancellationToken>,
    tick_tx: mpsc::UnboundedSender<u64>,
    tick_rx: mpsc::UnboundedReceiver<u64>,
}

impl<P: Persistence, C: ProxyClient> ChatController<P, C> {
    pub fn new(store: SessionStore<P>, client: C, scheduler: Arc<dyn Scheduler>) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            store,
            composer: Composer::new(),
            typewriter: Typewriter::new(),
            client,
            scheduler,
            reveal_token: None,
            tick_tx,
            tick_rx,
        }
    }

    pub fn store(&self) -> &SessionStore<P> {
        &self.store
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_loading(&self) -> bool {
        self.composer.is_loading()
    }

    /// Current reveal buffer; empty when nothing is being revealed.
    pub fn reveal_buffer(&self) -> &str {
        self.typewriter.buffer()
    }

    pub fn is_revealing(&self) -> bool {
        self.typewriter.is_revealing()
    }

    pub fn new_chat(&mut self) -> ChatId {
        self.flush_reveal();
        let id = self.store.create_chat();
        self.composer.reset();
        id
    }

    pub fn delete_chat(&mut self, id: &str) -> bool {
        self.flush_reveal();
        self.store.delete_chat(id)
    }

    pub fn switch_chat(&mut self, id: &str) -> bool {
        self.flush_reveal();
        self.store.switch_active(id)
    }

    /// Sends preset question `index` (0-based) and hides the presets.
    pub async fn send_preset(&mut self, index: usize) -> SendOutcome {
        let Some(preset) = PRESET_QUESTIONS.get(index) else {
            return SendOutcome::NothingToSend;
        };
        self.composer.hide_presets();
        self.send(Some(preset)).await
    }

    pub async fn send(&mut self, preset: Option<&str>) -> SendOutcome {
        if self.composer.is_loading() {
            return SendOutcome::Busy;
        }
        let Some(submission) = self.composer.take_submission(preset) else {
            return SendOutcome::NothingToSend;
        };

        self.flush_reveal();

        let chat_id = self.store.active_chat_id().to_string();
        self.store.append_message(
            &chat_id,
            Message::user(&submission.text, submission.previews()),
        );
        self.composer.set_loading(true);

        let request = ProxyRequest::from(&submission);
        let outcome = match self.client.generate(&request).await {
            Ok(output) => {
                let text = if output.is_empty() {
                    EMPTY_REPLY_TEXT.to_string()
                } else {
                    output
                };
                self.start_reveal(&chat_id, &text.replace('*', ""))
            }
            Err(ClientError::Status { status, message }) => {
                log::warn!("Proxy answered {}: {}", status, message);
                self.start_reveal(&chat_id, SERVER_ERROR_TEXT)
            }
            Err(e) => {
                log::error!("Prompt could not be processed: {}", e);
                self.store
                    .append_message(&chat_id, Message::assistant(PROCESSING_ERROR_TEXT));
                SendOutcome::Failed { chat_id }
            }
        };

        self.composer.set_loading(false);
        outcome
    }

    fn start_reveal(&mut self, chat_id: &str, text: &str) -> SendOutcome {
        self.cancel_timer();
        let (generation, interrupted) = self.typewriter.begin(chat_id, text);
        if let Some(reveal) = interrupted {
            self.commit(reveal);
        }

        let tx = self.tick_tx.clone();
        let token = self.scheduler.schedule(
            REVEAL_PERIOD,
            Box::new(move || {
                let _ = tx.send(generation);
            }),
        );
        self.reveal_token = Some(token);

        SendOutcome::Revealing {
            chat_id: chat_id.to_string(),
            generation,
        }
    }

    /// Waits for the next scheduler tick.
    pub async fn next_tick(&mut self) -> Option<u64> {
        self.tick_rx.recv().await
    }

    pub fn on_tick(&mut self, generation: u64) -> TickOutcome {
        match self.typewriter.advance(generation) {
            RevealStep::Stale => TickOutcome::Stale,
            RevealStep::Progress(ch) => TickOutcome::Progress(ch),
            RevealStep::Finished { last, reveal } => {
                self.cancel_timer();
                let chat_id = reveal.chat_id.clone();
                self.commit(reveal);
                TickOutcome::Committed { last, chat_id }
            }
        }
    }

    /// Handles every tick already queued, without waiting.
    pub fn process_pending_ticks(&mut self) -> Vec<TickOutcome> {
        let mut outcomes = vec![];
        while let Ok(generation) = self.tick_rx.try_recv() {
            outcomes.push(self.on_tick(generation));
        }
        outcomes
    }

    /// Stops a running reveal and commits its full text right away.
    pub fn flush_reveal(&mut self) -> Option<Reveal> {
        self.cancel_timer();
        let reveal = self.typewriter.interrupt()?;
        self.commit(reveal.clone());
        Some(reveal)
    }

    /// Text of message `index` in the active chat, marking it as copied.
    pub fn copy_message(&mut self, index: usize) -> Option<String> {
        let text = self.store.active_chat()?.messages.get(index)?.text.clone();
        self.composer.mark_copied(index, Instant::now());
        Some(text)
    }

    fn commit(&mut self, reveal: Reveal) {
        self.store
            .append_message(&reveal.chat_id, Message::assistant(&reveal.text));
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.reveal_token.take() {
            token.cancel();
        }
    }
}

impl<P: Persistence, C: ProxyClient> Drop for ChatController<P, C> {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
