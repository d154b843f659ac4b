//! The streaming-reassembly state machine for one question/answer exchange.
//!
//! A [`StreamSession`] consumes the ordered [`ServerEvent`] stream for one
//! exchange and turns it into idempotent, monotonic calls against a
//! [`Renderer`]. It owns no UI and no transport: the TUI transcript and the
//! one-shot JSON collector both implement [`Renderer`] and share this logic.

use crate::protocol::{SearchHit, ServerEvent};

/// UI primitives the session drives. Implementations are responsible for
/// neutralizing untrusted text: plain strings are stripped of control and
/// escape sequences before display, answer text goes through the markdown
/// renderer instead.
pub trait Renderer {
    /// Open the exchange container grouping everything produced by one
    /// response. Called at most once per session; hides the pending
    /// indicator as a side effect.
    fn open_exchange(&mut self);

    /// Append an annotation showing the server's rewritten query.
    fn push_annotation(&mut self, query: &str);

    /// Append a row of retrieval source cards. Never called with an empty
    /// slice.
    fn push_source_row(&mut self, hits: &[SearchHit]);

    /// Replace the answer bubble's content with the full accumulated text.
    /// Full replace, not a patch: each call re-renders the whole string.
    fn set_answer(&mut self, markdown: &str);

    /// Append a plain message that belongs to no exchange (connection
    /// errors, server error events).
    fn push_notice(&mut self, text: &str);

    /// Show or hide the waiting-for-response indicator.
    fn set_pending(&mut self, pending: bool);

    /// Keep the latest content visible.
    fn scroll_to_latest(&mut self);
}

/// State for one in-flight exchange: the accumulated answer text plus the
/// lazily-created container and bubble flags. Exactly one session is live
/// at a time; it is created by [`StreamSession::start`] and destroyed by a
/// terminal event.
#[derive(Debug, Default)]
pub struct StreamSession {
    /// Answer text accumulated from `Chunk` events, in arrival order.
    answer: String,
    /// Whether the exchange container has been created.
    exchange_open: bool,
    /// Whether the answer bubble has been created.
    bubble_open: bool,
    /// Set by `start`, cleared by a terminal event. Events arriving while
    /// this is false are dropped, which enforces the invariant that no
    /// chunk is processed after `Done` or `Error`.
    active: bool,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The answer text accumulated so far.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Begin a new exchange: reset all state and show the pending
    /// indicator. The caller guarantees no other session is active (the UI
    /// layer disables submission while one is open).
    pub fn start(&mut self, renderer: &mut impl Renderer) {
        self.end();
        self.active = true;
        renderer.set_pending(true);
    }

    /// Consume one server event, mutating session state and the renderer.
    /// Runs to completion before the next event is handled; never blocks.
    pub fn handle(&mut self, event: ServerEvent, renderer: &mut impl Renderer) {
        if !self.active {
            return;
        }

        match event {
            ServerEvent::RewrittenQuery { query } => {
                self.ensure_exchange(renderer);
                renderer.push_annotation(&query);
            }
            ServerEvent::SearchResults { results } => {
                // The container is ensured even for an empty hit list; only
                // the card row is skipped.
                self.ensure_exchange(renderer);
                if !results.is_empty() {
                    renderer.push_source_row(&results);
                }
            }
            ServerEvent::Chunk { content } => {
                if content.is_empty() {
                    return;
                }
                if !self.bubble_open {
                    self.ensure_exchange(renderer);
                    self.bubble_open = true;
                }
                self.answer.push_str(&content);
                renderer.set_answer(&self.answer);
                renderer.scroll_to_latest();
            }
            // `success: false` is not itself an error; failures the user
            // should see arrive as an explicit Error event.
            ServerEvent::Done { success: _ } => {
                renderer.set_pending(false);
                self.end();
            }
            ServerEvent::Error { message } => {
                renderer.set_pending(false);
                renderer.push_notice(&message);
                self.end();
            }
        }
    }

    /// Clear all session state so a subsequent `start` begins clean. The
    /// partial answer already rendered stays visible; nothing is rolled
    /// back.
    pub fn end(&mut self) {
        self.answer.clear();
        self.exchange_open = false;
        self.bubble_open = false;
        self.active = false;
    }

    fn ensure_exchange(&mut self, renderer: &mut impl Renderer) {
        if !self.exchange_open {
            renderer.open_exchange();
            self.exchange_open = true;
        }
    }
}
