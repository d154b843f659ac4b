//! `ask` subcommand for non-interactive mode (JSON output for agents)

use anyhow::{bail, Context, Result};
use confab::channel::{ChannelHandle, ChannelMsg, Endpoint, ReconnectPolicy};
use confab::protocol::{SearchHit, ServerEvent};
use confab::session::{Renderer, StreamSession};
use confab::transcript::{AskOutput, SourceOutput};
use tracing::info;

/// Renderer that records one exchange into the JSON output document
/// instead of a transcript.
#[derive(Debug, Default)]
struct AskCollector {
    rewritten_query: Option<String>,
    sources: Vec<SearchHit>,
    answer: String,
    error: Option<String>,
}

impl Renderer for AskCollector {
    fn open_exchange(&mut self) {}

    fn push_annotation(&mut self, query: &str) {
        self.rewritten_query = Some(query.to_string());
    }

    fn push_source_row(&mut self, hits: &[SearchHit]) {
        self.sources.extend_from_slice(hits);
    }

    fn set_answer(&mut self, markdown: &str) {
        // Full replace: the session always passes the whole accumulated
        // text.
        self.answer = markdown.to_string();
    }

    fn push_notice(&mut self, text: &str) {
        self.error = Some(text.to_string());
    }

    fn set_pending(&mut self, _pending: bool) {}

    fn scroll_to_latest(&mut self) {}
}

impl AskCollector {
    fn into_output(self, query: String, success: bool) -> AskOutput {
        AskOutput {
            query,
            rewritten_query: self.rewritten_query,
            sources: self.sources.iter().map(SourceOutput::from).collect(),
            answer: self.answer,
            success: success && self.error.is_none(),
            error: self.error,
        }
    }
}

/// Run one exchange and print the result as JSON.
pub fn run_ask(server: &str, tls: bool, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("query is empty");
    }

    let endpoint = Endpoint::parse(server, tls)?;
    let (channel, events) = ChannelHandle::connect(endpoint, ReconnectPolicy::default());

    // Wait for the socket; the channel keeps retrying on its own.
    info!("connecting to {}", server);
    loop {
        match events.recv().context("channel thread stopped")? {
            ChannelMsg::Connected => break,
            _ => continue,
        }
    }

    if !channel.send(query) {
        bail!("failed to send query");
    }

    let mut collector = AskCollector::default();
    let mut session = StreamSession::new();
    session.start(&mut collector);

    let mut success = true;
    while session.is_active() {
        match events.recv().context("channel thread stopped")? {
            ChannelMsg::Event(event) => {
                if let ServerEvent::Done { success: ok } = &event {
                    success = *ok;
                }
                session.handle(event, &mut collector);
            }
            // A one-shot exchange cannot survive its socket.
            ChannelMsg::Disconnected => bail!("connection lost before the answer completed"),
            ChannelMsg::Connected => {}
        }
    }

    let output = collector.into_output(query.to_string(), success);
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(events: Vec<ServerEvent>) -> (AskCollector, bool) {
        let mut collector = AskCollector::default();
        let mut session = StreamSession::new();
        session.start(&mut collector);
        let mut success = true;
        for event in events {
            if let ServerEvent::Done { success: ok } = &event {
                success = *ok;
            }
            session.handle(event, &mut collector);
        }
        (collector, success)
    }

    #[test]
    fn test_collector_builds_output_document() {
        let (collector, success) = drive(vec![
            ServerEvent::RewrittenQuery {
                query: "weather today".to_string(),
            },
            ServerEvent::SearchResults {
                results: vec![SearchHit {
                    id: 0,
                    score: 0.873,
                    paragraph: "Sunny, 21C".to_string(),
                }],
            },
            ServerEvent::Chunk {
                content: "It will be ".to_string(),
            },
            ServerEvent::Chunk {
                content: "sunny.".to_string(),
            },
            ServerEvent::Done { success: true },
        ]);

        let output = collector.into_output("weather".to_string(), success);
        let json = serde_json::to_string_pretty(&output).unwrap();
        insta::assert_snapshot!(json, @r#"
        {
          "query": "weather",
          "rewritten_query": "weather today",
          "sources": [
            {
              "label": "Source #1",
              "score": 0.873,
              "paragraph": "Sunny, 21C"
            }
          ],
          "answer": "It will be sunny.",
          "success": true
        }
        "#);
    }

    #[test]
    fn test_server_error_lands_in_output() {
        let (collector, success) = drive(vec![ServerEvent::Error {
            message: "backend unavailable".to_string(),
        }]);
        let output = collector.into_output("q".to_string(), success);
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("backend unavailable"));
        assert!(output.answer.is_empty());
    }

    #[test]
    fn test_done_failure_is_reported_in_output() {
        let (collector, success) = drive(vec![
            ServerEvent::Chunk {
                content: "partial".to_string(),
            },
            ServerEvent::Done { success: false },
        ]);
        let output = collector.into_output("q".to_string(), success);
        assert!(!output.success);
        assert!(output.error.is_none());
        assert_eq!(output.answer, "partial");
    }
}
