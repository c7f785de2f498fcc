//! Typewriter reveal of assistant replies.
//!
//! [`Typewriter`] is a plain state machine (`Idle -> Revealing -> Idle`) that
//! grows a reveal buffer one character per tick. Ticks come from a
//! [`Scheduler`]; every reveal gets a new generation number so ticks from a
//! cancelled reveal are recognised as stale and ignored.

use crate::session::ChatId;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const REVEAL_PERIOD: Duration = Duration::from_millis(25);

/// A reply waiting to be committed to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    pub chat_id: ChatId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// Tick for a reveal that is no longer running.
    Stale,
    Progress(char),
    /// The buffer reached the full text; `last` is the character revealed on
    /// this tick, if any.
    Finished { last: Option<char>, reveal: Reveal },
}

#[derive(Debug, Default)]
enum RevealState {
    #[default]
    Idle,
    Revealing {
        generation: u64,
        chat_id: ChatId,
        text: String,
        shown: usize,
    },
}

#[derive(Debug, Default)]
pub struct Typewriter {
    state: RevealState,
    generation: u64,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts revealing `text`. Returns the new generation and the reveal it
    /// interrupted, if one was running.
    pub fn begin(&mut self, chat_id: &str, text: &str) -> (u64, Option<Reveal>) {
        let interrupted = self.interrupt();
        self.generation += 1;
        self.state = RevealState::Revealing {
            generation: self.generation,
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            shown: 0,
        };
        (self.generation, interrupted)
    }

    pub fn advance(&mut self, generation: u64) -> RevealStep {
        let (text, shown) = match &mut self.state {
            RevealState::Revealing {
                generation: current,
                text,
                shown,
                ..
            } if *current == generation => (text, shown),
            _ => return RevealStep::Stale,
        };

        let next = text[*shown..].chars().next();
        if let Some(ch) = next {
            *shown += ch.len_utf8();
        }

        if *shown < text.len() {
            // `next` is always Some while there is text left.
            return next.map(RevealStep::Progress).unwrap_or(RevealStep::Stale);
        }

        match std::mem::take(&mut self.state) {
            RevealState::Revealing { chat_id, text, .. } => RevealStep::Finished {
                last: next,
                reveal: Reveal { chat_id, text },
            },
            RevealState::Idle => RevealStep::Stale,
        }
    }

    /// Stops the running reveal and hands back its full text.
    pub fn interrupt(&mut self) -> Option<Reveal> {
        match std::mem::take(&mut self.state) {
            RevealState::Revealing { chat_id, text, .. } => Some(Reveal { chat_id, text }),
            RevealState::Idle => None,
        }
    }

    pub fn is_revealing(&self) -> bool {
        matches!(self.state, RevealState::Revealing { .. })
    }

    /// The revealed prefix; empty when idle.
    pub fn buffer(&self) -> &str {
        match &self.state {
            RevealState::Revealing { text, shown, .. } => &text[..*shown],
            RevealState::Idle => "",
        }
    }
}

pub type Tick = Box<dyn Fn() + Send + Sync>;

pub trait Scheduler: Send + Sync {
    /// Calls `tick` every `period` until the returned token is cancelled.
    fn schedule(&self, period: Duration, tick: Tick) -> CancellationToken;
}

/// Interval timer on the tokio runtime. The first tick fires one period after
/// scheduling.
#[derive(Debug, Default, Clone)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, period: Duration, tick: Tick) -> CancellationToken {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => tick(),
                }
            }
        });

        token
    }
}

/// Scheduler driven by hand: ticks fire only when [`ManualScheduler::fire`] is
/// called. Used by headless runs and tests.
#[derive(Default, Clone)]
pub struct ManualScheduler {
    timers: Arc<Mutex<Vec<(CancellationToken, Arc<Tick>)>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every live timer once; returns how many fired.
    pub fn fire(&self) -> usize {
        let live: Vec<Arc<Tick>> = {
            let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
            timers.retain(|(token, _)| !token.is_cancelled());
            timers.iter().map(|(_, tick)| tick.clone()).collect()
        };
        for tick in &live {
            (tick.as_ref())();
        }
        live.len()
    }

    pub fn live_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(token, _)| !token.is_cancelled())
            .count()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, _period: Duration, tick: Tick) -> CancellationToken {
        let token = CancellationToken::new();
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((token.clone(), Arc::new(tick)));
        token
    }
}
