use crate::channel::{ChannelHandle, ChannelMsg};
use crate::session::{Renderer, StreamSession};
use crate::transcript::Transcript;
use std::sync::mpsc::Receiver;
use std::time::Instant;

/// Fixed local notice for a send attempted while the socket is down. The
/// channel keeps reconnecting on its own; nothing was sent.
pub const CONNECTION_ERROR_NOTICE: &str = "Connection error. Please try again in a moment.";

/// Typing indicator animation period per dot.
const SPINNER_INTERVAL_MS: u128 = 300;

pub struct App {
    /// Current input text
    pub input: String,
    /// Cursor position in input (char index)
    pub cursor: usize,
    /// The conversation
    pub transcript: Transcript,
    /// The in-flight exchange state machine
    session: StreamSession,
    /// Handle for sending queries
    channel: ChannelHandle,
    /// Messages from the channel thread
    events: Option<Receiver<ChannelMsg>>,
    /// Whether the socket is currently open
    pub connected: bool,
    /// Should quit
    pub should_quit: bool,
    /// Answer text to copy to the clipboard (set on Ctrl+Y)
    pub should_copy: Option<String>,
    /// Transient status message
    pub status: Option<String>,
    /// Transcript scroll offset in lines
    pub scroll: usize,
    /// Start instant, drives the typing indicator animation
    started: Instant,
}

impl App {
    pub fn new(channel: ChannelHandle, events: Receiver<ChannelMsg>) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            transcript: Transcript::new(),
            session: StreamSession::new(),
            channel,
            events: Some(events),
            connected: false,
            should_quit: false,
            should_copy: None,
            status: None,
            scroll: 0,
            started: Instant::now(),
        }
    }

    /// A session is open: submission is disabled until a terminal event.
    pub fn busy(&self) -> bool {
        self.session.is_active()
    }

    /// Check for channel updates (call this in the main loop)
    pub fn poll_channel_updates(&mut self) {
        use std::sync::mpsc::TryRecvError;

        let Some(rx) = &self.events else {
            return;
        };

        let mut messages = Vec::new();
        let mut channel_gone = false;
        loop {
            match rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    channel_gone = true;
                    break;
                }
            }
        }

        for msg in messages {
            match msg {
                ChannelMsg::Connected => {
                    self.connected = true;
                }
                ChannelMsg::Disconnected => {
                    // The in-flight session, if any, is abandoned; it stays
                    // open until the server ends a future exchange. The
                    // status bar shows the reconnecting state.
                    self.connected = false;
                }
                ChannelMsg::Event(event) => {
                    self.session.handle(event, &mut self.transcript);
                }
            }
        }

        if channel_gone {
            self.connected = false;
            self.status = Some("Connection thread stopped unexpectedly".to_string());
            self.events = None;
        }
    }

    /// Submit the current input as a query.
    pub fn submit(&mut self) {
        if self.busy() {
            return;
        }
        let query = self.input.trim().to_string();
        if query.is_empty() {
            return;
        }

        self.input.clear();
        self.cursor = 0;
        self.status = None;
        self.transcript.push_user(&query);
        self.transcript.set_follow(true);

        if self.channel.send(&query) {
            self.session.start(&mut self.transcript);
        } else {
            self.transcript.push_notice(CONNECTION_ERROR_NOTICE);
        }
    }

    /// Handle character input
    pub fn on_char(&mut self, c: char) {
        if self.busy() {
            return;
        }
        let byte_pos = self.cursor_byte_pos();
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Insert a newline at the cursor (Alt+Enter)
    pub fn on_newline(&mut self) {
        self.on_char('\n');
    }

    /// Handle backspace
    pub fn on_backspace(&mut self) {
        if self.busy() {
            return;
        }
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = self.cursor_byte_pos();
            self.input.remove(byte_pos);
        }
    }

    /// Handle delete key
    pub fn on_delete(&mut self) {
        if self.busy() {
            return;
        }
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            let byte_pos = self.cursor_byte_pos();
            self.input.remove(byte_pos);
        }
    }

    /// Clear input, or quit when it is already empty
    pub fn on_escape(&mut self) {
        if !self.input.is_empty() {
            self.input.clear();
            self.cursor = 0;
        } else if !self.busy() {
            self.should_quit = true;
        }
    }

    /// Move cursor left
    pub fn on_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move cursor right
    pub fn on_right(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor < char_count {
            self.cursor += 1;
        }
    }

    /// Move cursor to start
    pub fn on_home(&mut self) {
        self.cursor = 0;
    }

    /// Move cursor to end
    pub fn on_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    /// Scroll transcript up, detaching from the latest content
    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.transcript.set_follow(false);
    }

    /// Scroll transcript down (the renderer clamps and re-follows at the
    /// bottom)
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Request a clipboard copy of the latest answer (Ctrl+Y)
    pub fn copy_answer(&mut self) {
        match self.transcript.last_answer() {
            Some(answer) => self.should_copy = Some(answer.to_string()),
            None => self.status = Some("No answer to copy yet".to_string()),
        }
    }

    /// Current typing indicator frame
    pub fn spinner_frame(&self) -> usize {
        (self.started.elapsed().as_millis() / SPINNER_INTERVAL_MS) as usize % 3
    }

    /// Convert cursor (char index) to byte position
    fn cursor_byte_pos(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }
}
