use anyhow::Result;
use clap::{Parser, Subcommand};
use confab::channel::{ChannelHandle, Endpoint, ReconnectPolicy};
use confab::{app::App, tui, ui};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "confab", version, about = "Terminal chat client for streaming ask-agent backends")]
struct Cli {
    /// Agent server address as host[:port]
    #[arg(long, default_value = "127.0.0.1:8000", env = "CONFAB_SERVER")]
    server: String,

    /// Connect with TLS (wss instead of ws)
    #[arg(long, env = "CONFAB_TLS")]
    tls: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question and print the full exchange as JSON
    Ask {
        /// The question to send
        query: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Some(Command::Ask { query }) => {
            init_stderr_logging();
            cli::run_ask(&args.server, args.tls, &query.join(" "))
        }
        None => {
            init_file_logging();
            run_tui(&args.server, args.tls)
        }
    }
}

fn run_tui(server: &str, tls: bool) -> Result<()> {
    let endpoint = Endpoint::parse(server, tls)?;
    let (channel, events) = ChannelHandle::connect(endpoint, ReconnectPolicy::default());
    let mut app = App::new(channel, events);

    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app);
    tui::restore()?;

    result
}

fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    loop {
        // Pull channel updates before drawing
        app.poll_channel_updates();

        terminal.draw(|frame| ui::render(frame, app))?;

        if app.should_quit {
            break;
        }

        // Clipboard copy requested via Ctrl+Y
        if let Some(text) = app.should_copy.take() {
            match copy_to_clipboard(&text) {
                Ok(()) => app.status = Some("Answer copied to clipboard".to_string()),
                Err(e) => app.status = Some(format!("Copy failed: {}", e)),
            }
        }

        // Handle all pending events (drain queue to prevent mouse event flooding)
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                // On Windows, crossterm sends both Press and Release events.
                // Only handle Press to avoid double input.
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.should_quit = true;
                    }
                    KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        app.copy_answer();
                    }
                    KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                        app.on_newline();
                    }
                    KeyCode::Enter => app.submit(),
                    KeyCode::Esc => app.on_escape(),
                    KeyCode::Backspace => app.on_backspace(),
                    KeyCode::Delete => app.on_delete(),
                    KeyCode::Left => app.on_left(),
                    KeyCode::Right => app.on_right(),
                    KeyCode::Home => app.on_home(),
                    KeyCode::End => app.on_end(),
                    KeyCode::PageUp => app.scroll_up(15),
                    KeyCode::PageDown => app.scroll_down(15),
                    KeyCode::Char(c) => app.on_char(c),
                    _ => {}
                },
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_up(3),
                    MouseEventKind::ScrollDown => app.scroll_down(3),
                    _ => {}
                },
                _ => {}
            }
        }

        // Small sleep to prevent busy loop
        std::thread::sleep(Duration::from_millis(16));
    }

    Ok(())
}

/// Copy text to clipboard
fn copy_to_clipboard(text: &str) -> Result<()> {
    use arboard::Clipboard;
    let mut clipboard = Clipboard::new()?;
    clipboard.set_text(text)?;
    Ok(())
}

/// `ask` mode: logs go to stderr, stdout carries the JSON document.
fn init_stderr_logging() {
    let filter = EnvFilter::try_from_env("CONFAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// TUI mode: the alternate screen cannot take log output, so logging is
/// off unless CONFAB_LOG is set, in which case it goes to a file under
/// the cache dir.
fn init_file_logging() {
    let Ok(filter) = EnvFilter::try_from_env("CONFAB_LOG") else {
        return;
    };

    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("confab");
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = std::fs::File::create(dir.join("confab.log")) else {
        return;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}
