//! Conversation data model the UI draws.
//!
//! A transcript is an ordered list of nodes: user messages, plain notices,
//! and exchange containers. Exactly one exchange container is created per
//! session; annotations, source card rows, and the answer bubble land
//! inside it. The transcript is the TUI's [`Renderer`] implementation, so
//! the session core never touches ratatui types.

use crate::markdown::sanitize_remote_text;
use crate::protocol::SearchHit;
use crate::session::Renderer;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A plain message (user input or a notice).
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything one streamed response produced, grouped the way it is drawn.
#[derive(Debug, Clone, Default)]
pub struct Exchange {
    /// Rewritten-query annotations, in arrival order.
    pub annotations: Vec<String>,
    /// Source card rows, one per search_results event.
    pub source_rows: Vec<Vec<SearchHit>>,
    /// The answer bubble's full markdown text, replaced on every chunk.
    pub answer: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// One entry in the conversation.
#[derive(Debug, Clone)]
pub enum Node {
    User(Message),
    Notice(Message),
    Exchange(Exchange),
}

/// The whole conversation plus the transient indicator flags the UI needs.
#[derive(Debug, Default)]
pub struct Transcript {
    nodes: Vec<Node>,
    pending: bool,
    follow: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the waiting-for-response indicator is visible.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the view should stick to the latest content.
    pub fn wants_follow(&self) -> bool {
        self.follow
    }

    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
    }

    /// Record a submitted question. User text is trusted as far as markup
    /// goes but still must not reach the terminal raw.
    pub fn push_user(&mut self, text: &str) {
        self.nodes
            .push(Node::User(Message::new(sanitize_remote_text(text))));
    }

    /// The most recent completed or in-flight answer text, for clipboard
    /// copy.
    pub fn last_answer(&self) -> Option<&str> {
        self.nodes.iter().rev().find_map(|node| match node {
            Node::Exchange(exchange) => exchange.answer.as_deref(),
            _ => None,
        })
    }

    fn last_exchange_mut(&mut self) -> Option<&mut Exchange> {
        self.nodes.iter_mut().rev().find_map(|node| match node {
            Node::Exchange(exchange) => Some(exchange),
            _ => None,
        })
    }
}

impl Renderer for Transcript {
    fn open_exchange(&mut self) {
        // First content hides the typing indicator.
        self.pending = false;
        self.nodes.push(Node::Exchange(Exchange {
            started_at: Some(Utc::now()),
            ..Exchange::default()
        }));
    }

    fn push_annotation(&mut self, query: &str) {
        let query = sanitize_remote_text(query);
        if let Some(exchange) = self.last_exchange_mut() {
            exchange.annotations.push(query);
        }
    }

    fn push_source_row(&mut self, hits: &[SearchHit]) {
        let hits: Vec<SearchHit> = hits
            .iter()
            .map(|hit| SearchHit {
                id: hit.id,
                score: hit.score,
                paragraph: sanitize_remote_text(&hit.paragraph),
            })
            .collect();
        if let Some(exchange) = self.last_exchange_mut() {
            exchange.source_rows.push(hits);
        }
    }

    fn set_answer(&mut self, markdown: &str) {
        // Stored raw; the markdown renderer sanitizes at draw time.
        if let Some(exchange) = self.last_exchange_mut() {
            exchange.answer = Some(markdown.to_string());
        }
    }

    fn push_notice(&mut self, text: &str) {
        self.nodes
            .push(Node::Notice(Message::new(sanitize_remote_text(text))));
    }

    fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    fn scroll_to_latest(&mut self) {
        self.follow = true;
    }
}

// ============================================================================
// Output types for `confab ask` (JSON serialization for agents)
// ============================================================================

/// The JSON document `confab ask` prints for one exchange.
#[derive(Debug, Serialize)]
pub struct AskOutput {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
    pub sources: Vec<SourceOutput>,
    pub answer: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One retrieval hit in JSON output, with the display label precomputed.
#[derive(Debug, Serialize)]
pub struct SourceOutput {
    pub label: String,
    pub score: f64,
    pub paragraph: String,
}

impl From<&SearchHit> for SourceOutput {
    fn from(hit: &SearchHit) -> Self {
        Self {
            label: hit.label(),
            score: hit.score,
            paragraph: hit.paragraph.clone(),
        }
    }
}
