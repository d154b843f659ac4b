use confab::app::{App, CONNECTION_ERROR_NOTICE};
use confab::channel::{ChannelHandle, ChannelMsg};
use confab::protocol::{SearchHit, ServerEvent};
use ratatui::{backend::TestBackend, Terminal};
use std::sync::mpsc::Sender;

/// Build an app wired to a stub channel: no thread, no socket. Returned
/// sender injects channel messages, the receiver records outbound queries.
fn test_app(
    connected: bool,
) -> (
    App,
    tokio::sync::mpsc::UnboundedReceiver<String>,
    Sender<ChannelMsg>,
) {
    let (handle, outbound) = ChannelHandle::stub(connected);
    let (tx, rx) = std::sync::mpsc::channel();
    (App::new(handle, rx), outbound, tx)
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.on_char(c);
    }
}

fn send_events(app: &mut App, tx: &Sender<ChannelMsg>, events: Vec<ServerEvent>) {
    for event in events {
        tx.send(ChannelMsg::Event(event)).unwrap();
    }
    app.poll_channel_updates();
}

/// Render app to test terminal
fn render_app(app: &mut App) -> Terminal<TestBackend> {
    let backend = TestBackend::new(80, 40);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| confab::ui::render(f, app)).unwrap();
    terminal
}

/// Check if buffer contains text
fn buffer_contains(terminal: &Terminal<TestBackend>, text: &str) -> bool {
    let buffer = terminal.backend().buffer();
    let content: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
    content.contains(text)
}

fn chunk(content: &str) -> ServerEvent {
    ServerEvent::Chunk {
        content: content.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_welcome_screen() {
    let (mut app, _outbound, _tx) = test_app(true);
    let terminal = render_app(&mut app);

    assert!(buffer_contains(&terminal, "confab"));
    assert!(buffer_contains(&terminal, "Ask the agent anything."));
    assert!(buffer_contains(&terminal, "Ask anything..."));
}

#[test]
fn test_full_exchange_renders_all_parts() {
    let (mut app, mut outbound, tx) = test_app(true);
    tx.send(ChannelMsg::Connected).unwrap();
    type_text(&mut app, "weather today");
    app.submit();

    assert_eq!(outbound.try_recv().ok().as_deref(), Some("weather today"));

    send_events(
        &mut app,
        &tx,
        vec![
            ServerEvent::RewrittenQuery {
                query: "weather forecast for today".to_string(),
            },
            ServerEvent::SearchResults {
                results: vec![SearchHit {
                    id: 0,
                    score: 0.873,
                    paragraph: "Sunny, 21C".to_string(),
                }],
            },
            chunk("It will be "),
            chunk("sunny."),
            ServerEvent::Done { success: true },
        ],
    );

    let terminal = render_app(&mut app);

    assert!(buffer_contains(&terminal, "You"));
    assert!(buffer_contains(&terminal, "weather today"));
    assert!(buffer_contains(&terminal, "weather forecast for today"));
    assert!(buffer_contains(&terminal, "Source #1"));
    assert!(buffer_contains(&terminal, "0.87"));
    assert!(buffer_contains(&terminal, "Sunny, 21C"));
    assert!(buffer_contains(&terminal, "Agent"));
    assert!(buffer_contains(&terminal, "It will be sunny."));
    assert!(buffer_contains(&terminal, "connected"));

    // The session is closed and input is accepting again.
    assert!(!app.busy());
    assert_eq!(app.transcript.last_answer(), Some("It will be sunny."));
}

#[test]
fn test_typing_indicator_while_pending() {
    let (mut app, _outbound, _tx) = test_app(true);
    type_text(&mut app, "slow question");
    app.submit();

    assert!(app.busy());
    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "●"));
    assert!(buffer_contains(&terminal, "Waiting for the answer..."));
}

#[test]
fn test_error_only_exchange() {
    let (mut app, _outbound, tx) = test_app(true);
    type_text(&mut app, "anything");
    app.submit();

    send_events(
        &mut app,
        &tx,
        vec![ServerEvent::Error {
            message: "backend unavailable".to_string(),
        }],
    );

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "backend unavailable"));
    // No exchange container parts were created.
    assert!(!buffer_contains(&terminal, "Source #"));
    assert!(!buffer_contains(&terminal, "↪"));
    assert!(!buffer_contains(&terminal, "Agent"));
    assert!(!app.busy(), "error ends the session");
    assert!(!app.transcript.is_pending());
}

#[test]
fn test_partial_answer_survives_error() {
    let (mut app, _outbound, tx) = test_app(true);
    type_text(&mut app, "q");
    app.submit();

    send_events(
        &mut app,
        &tx,
        vec![
            chunk("The answer starts"),
            ServerEvent::Error {
                message: "stream interrupted".to_string(),
            },
        ],
    );

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "The answer starts"));
    assert!(buffer_contains(&terminal, "stream interrupted"));
    assert!(!app.busy());
}

#[test]
fn test_submit_while_disconnected() {
    let (mut app, mut outbound, _tx) = test_app(false);
    type_text(&mut app, "hello");
    app.submit();

    assert!(outbound.try_recv().is_err(), "nothing reaches the server");
    assert!(!app.busy(), "input stays enabled");

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "Connection error."));
    assert!(buffer_contains(&terminal, CONNECTION_ERROR_NOTICE));
    assert!(buffer_contains(&terminal, "reconnecting"));
}

#[test]
fn test_submission_locked_while_session_open() {
    let (mut app, mut outbound, _tx) = test_app(true);
    type_text(&mut app, "first");
    app.submit();
    assert!(outbound.try_recv().is_ok());

    type_text(&mut app, "second");
    app.submit();
    assert!(
        outbound.try_recv().is_err(),
        "second query must not be sent while the session is open"
    );
}

#[test]
fn test_two_sequential_exchanges_start_clean() {
    let (mut app, _outbound, tx) = test_app(true);

    type_text(&mut app, "first question");
    app.submit();
    send_events(
        &mut app,
        &tx,
        vec![chunk("First answer."), ServerEvent::Done { success: true }],
    );
    assert!(!app.busy());

    type_text(&mut app, "second question");
    app.submit();
    send_events(
        &mut app,
        &tx,
        vec![chunk("Second answer."), ServerEvent::Done { success: false }],
    );

    // The second bubble holds only the second answer; Done{success:false}
    // closed the session just like a successful completion.
    assert_eq!(app.transcript.last_answer(), Some("Second answer."));
    assert!(!app.busy());

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "First answer."));
    assert!(buffer_contains(&terminal, "Second answer."));
}

#[test]
fn test_markdown_answer_is_styled_not_literal() {
    let (mut app, _outbound, tx) = test_app(true);
    type_text(&mut app, "q");
    app.submit();
    send_events(
        &mut app,
        &tx,
        vec![
            chunk("Use **cargo** to run `confab`"),
            ServerEvent::Done { success: true },
        ],
    );

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "cargo"));
    assert!(buffer_contains(&terminal, "confab"));
    assert!(!buffer_contains(&terminal, "**"), "markers are consumed");
    assert!(!buffer_contains(&terminal, "`"), "markers are consumed");
}

#[test]
fn test_empty_search_results_render_no_cards() {
    let (mut app, _outbound, tx) = test_app(true);
    type_text(&mut app, "q");
    app.submit();
    send_events(
        &mut app,
        &tx,
        vec![
            ServerEvent::SearchResults { results: vec![] },
            chunk("No sources needed."),
            ServerEvent::Done { success: true },
        ],
    );

    let terminal = render_app(&mut app);
    assert!(!buffer_contains(&terminal, "Source #"));
    assert!(buffer_contains(&terminal, "No sources needed."));
}

#[test]
fn test_connection_state_in_status_bar() {
    let (mut app, _outbound, tx) = test_app(true);
    tx.send(ChannelMsg::Connected).unwrap();
    app.poll_channel_updates();
    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "● connected"));

    tx.send(ChannelMsg::Disconnected).unwrap();
    app.poll_channel_updates();
    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "○ reconnecting..."));
}

#[test]
fn test_remote_escape_sequences_never_reach_the_buffer() {
    let (mut app, _outbound, tx) = test_app(true);
    type_text(&mut app, "q");
    app.submit();
    send_events(
        &mut app,
        &tx,
        vec![
            ServerEvent::RewrittenQuery {
                query: "clean\u{1b}[2J query".to_string(),
            },
            chunk("safe \u{1b}[31manswer"),
            ServerEvent::Done { success: true },
        ],
    );

    let terminal = render_app(&mut app);
    assert!(buffer_contains(&terminal, "clean query"));
    assert!(buffer_contains(&terminal, "safe answer"));
    assert!(!buffer_contains(&terminal, "\u{1b}"));
}
