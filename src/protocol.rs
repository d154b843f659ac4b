//! Wire model for the ask-agent connection.
//!
//! One WebSocket, JSON-object framed, bidirectional. The client sends a
//! single request shape; the server answers with a stream of frames
//! discriminated by a `type` field. Frames the client does not recognize
//! decode to `None` and are dropped by the channel.

use serde::{Deserialize, Serialize};

/// The single outbound request: `{"query": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// One server-pushed frame of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The server's reformulation of the question, shown as an annotation.
    RewrittenQuery { query: String },
    /// Ordered retrieval hits backing the upcoming answer.
    SearchResults { results: Vec<SearchHit> },
    /// An incremental fragment of the answer text, concatenated in order.
    Chunk { content: String },
    /// Terminal frame: the stream finished.
    Done { success: bool },
    /// Terminal frame: the server failed; `message` is shown verbatim.
    Error { message: String },
}

impl ServerEvent {
    /// Decode one wire frame. Unknown `type` values and malformed JSON
    /// both yield `None`; such frames are ignored, never fatal.
    pub fn decode(text: &str) -> Option<ServerEvent> {
        serde_json::from_str(text).ok()
    }

    /// True for the frames that close a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerEvent::Done { .. } | ServerEvent::Error { .. })
    }
}

/// A single retrieval hit. `id` is the zero-based rank assigned by the
/// server; it is displayed one-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u32,
    pub score: f64,
    pub paragraph: String,
}

impl SearchHit {
    /// Display label, e.g. `Source #1` for `id == 0`.
    pub fn label(&self) -> String {
        format!("Source #{}", self.id + 1)
    }

    /// Score formatted with exactly two decimal places.
    pub fn score_label(&self) -> String {
        format!("{:.2}", self.score)
    }
}
