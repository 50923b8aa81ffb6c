//! Battle commentary with a local fallback pool
//!
//! Requests never block a tick. An API call is spawned on the current
//! tokio runtime when one exists; the resulting line (or the fallback
//! chosen after a failure) comes back over an mpsc channel that the
//! session drains at the next tick boundary.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::error::SimError;
use crate::core::types::Millis;
use crate::llm::client::CommentaryClient;

/// Minimum battle time between two API calls
pub const MIN_API_INTERVAL_MS: Millis = 15_000;

/// API silence after a rate-limit response
pub const RATE_LIMIT_BACKOFF_MS: Millis = 60_000;

pub const FALLBACK_COMMENTARY: &[&str] = &[
    "The interns are marching forward!",
    "A huge wave of enemies is approaching!",
    "Hold the line!",
    "The cannon is charging up!",
    "Victory is within reach!",
    "Don't let them break through!",
    "Reinforcements have arrived!",
    "That was a massive hit!",
    "The boss is angry!",
    "Keep deploying units!",
    "Defend the base at all costs!",
    "It's chaos on the battlefield!",
    "What a strategy!",
    "They are pushing us back!",
];

#[derive(Debug)]
enum CommentaryMessage {
    Line(String),
    Failed { rate_limited: bool },
}

pub struct Commentator {
    client: Option<Arc<CommentaryClient>>,
    tx: mpsc::UnboundedSender<CommentaryMessage>,
    rx: mpsc::UnboundedReceiver<CommentaryMessage>,
    rng: ChaCha8Rng,
    /// No API call before this battle time
    next_call_at: Millis,
}

impl Commentator {
    pub fn new(client: Option<CommentaryClient>, seed: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client: client.map(Arc::new),
            tx,
            rx,
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_call_at: 0,
        }
    }

    /// Fallback-only commentator
    pub fn offline(seed: u64) -> Self {
        Self::new(None, seed)
    }

    pub fn is_online(&self) -> bool {
        self.client.is_some()
    }

    /// Ask for one line about `event`; the answer arrives via `drain`
    pub fn request(&mut self, event: &str, now: Millis) {
        let Some(client) = self.client.clone() else {
            self.send_fallback();
            return;
        };
        if now < self.next_call_at {
            self.send_fallback();
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            debug!("No tokio runtime, using fallback commentary");
            self.send_fallback();
            return;
        };

        self.next_call_at = now + MIN_API_INTERVAL_MS;
        let tx = self.tx.clone();
        let event = event.to_string();
        handle.spawn(async move {
            let message = match client.commentate(&event).await {
                Ok(line) => CommentaryMessage::Line(line),
                Err(SimError::RateLimited) => CommentaryMessage::Failed { rate_limited: true },
                Err(e) => {
                    warn!(error = %e, "Commentary request failed");
                    CommentaryMessage::Failed { rate_limited: false }
                }
            };
            // The receiver is gone once the session is dropped
            let _ = tx.send(message);
        });
    }

    /// Lines that arrived since the last drain, oldest first
    pub fn drain(&mut self, now: Millis) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            match message {
                CommentaryMessage::Line(line) => lines.push(line),
                CommentaryMessage::Failed { rate_limited } => {
                    if rate_limited {
                        warn!("Commentary API rate limited, switching to local lines");
                        self.next_call_at = self.next_call_at.max(now + RATE_LIMIT_BACKOFF_MS);
                    }
                    lines.push(self.fallback_line());
                }
            }
        }
        lines
    }

    fn fallback_line(&mut self) -> String {
        FALLBACK_COMMENTARY
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Hold the line!")
            .to_string()
    }

    fn send_fallback(&mut self) {
        let line = self.fallback_line();
        let _ = self.tx.send(CommentaryMessage::Line(line));
    }
}

impl std::fmt::Debug for Commentator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commentator")
            .field("online", &self.is_online())
            .field("next_call_at", &self.next_call_at)
            .finish()
    }
}
