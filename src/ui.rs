use crate::app::App;
use crate::markdown;
use crate::theme::Theme;
use crate::transcript::{Exchange, Message, Node};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::sync::OnceLock;

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(Theme::detect)
}

/// Main UI rendering
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Main layout: transcript, spacing, input bar (3 lines), status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Transcript
            Constraint::Length(1), // Spacing
            Constraint::Length(3), // Input bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    // Horizontal padding (1 char each side) for every section
    let [transcript_area, input_area, status_area] =
        [main_layout[0], main_layout[2], main_layout[3]].map(|section| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Min(0),
                    Constraint::Length(1),
                ])
                .split(section)[1]
        });

    if app.transcript.is_empty() {
        render_welcome(frame, transcript_area);
    } else {
        render_transcript(frame, app, transcript_area);
    }
    render_input_bar(frame, app, input_area);
    render_status_bar(frame, app, status_area);
}

fn render_welcome(frame: &mut Frame, area: Rect) {
    let t = theme();

    let lines = vec![
        Line::from(Span::styled(
            "confab",
            Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Ask the agent anything.",
            Style::default().fg(t.dim_fg),
        )),
        Line::from(vec![
            Span::styled("Type a question and press ", Style::default().fg(t.dim_fg)),
            Span::styled(" Enter ", Style::default().bg(t.keycap_bg)),
            Span::styled(" to send it.", Style::default().fg(t.dim_fg)),
        ]),
    ];

    // Center the header block vertically
    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let block_area = Rect {
        x: area.x,
        y: area.y + top,
        width: area.width,
        height: (lines.len() as u16).min(area.height),
    };
    let paragraph = Paragraph::new(lines).alignment(ratatui::layout::Alignment::Center);
    frame.render_widget(paragraph, block_area);
}

fn render_transcript(frame: &mut Frame, app: &mut App, area: Rect) {
    let lines = build_transcript_lines(app, area.width as usize);

    // Clamp scroll; stick to the bottom while following, and re-attach
    // when a manual scroll reaches the bottom again.
    let visible = area.height as usize;
    let max_scroll = lines.len().saturating_sub(visible.min(lines.len()));
    if app.transcript.wants_follow() || app.scroll >= max_scroll {
        app.scroll = max_scroll;
        app.transcript.set_follow(true);
    }

    let paragraph = Paragraph::new(lines).scroll((app.scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

/// Build every transcript line at the given terminal width.
fn build_transcript_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let t = theme();
    // Reserve chars for bubble padding (1 left margin, 2 inside)
    let bubble_width = width.saturating_sub(3).max(8);

    let mut lines: Vec<Line<'static>> = Vec::new();

    for node in app.transcript.nodes() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        match node {
            Node::User(message) => push_user_message(&mut lines, message, bubble_width, t),
            Node::Notice(message) => push_notice(&mut lines, message, bubble_width, t),
            Node::Exchange(exchange) => push_exchange(&mut lines, exchange, bubble_width, t),
        }
    }

    if app.transcript.is_pending() {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.push(typing_indicator(app.spinner_frame(), t));
    }

    lines
}

fn push_user_message(
    lines: &mut Vec<Line<'static>>,
    message: &Message,
    bubble_width: usize,
    t: &Theme,
) {
    lines.push(Line::from(vec![
        Span::styled(
            "You",
            Style::default()
                .fg(t.user_label)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", format_time_ago(message.timestamp)),
            Style::default().fg(t.dim_fg),
        ),
    ]));

    for wrapped in wrap_text(&message.text, bubble_width) {
        let content = Line::from(Span::styled(wrapped, Style::default()));
        lines.push(bubble_line(content, bubble_width, t.user_bubble_bg));
    }
}

fn push_notice(lines: &mut Vec<Line<'static>>, message: &Message, width: usize, t: &Theme) {
    for wrapped in wrap_text(&message.text, width) {
        lines.push(Line::from(Span::styled(
            wrapped,
            Style::default().fg(t.notice_fg),
        )));
    }
}

fn push_exchange(
    lines: &mut Vec<Line<'static>>,
    exchange: &Exchange,
    bubble_width: usize,
    t: &Theme,
) {
    let annotation_style = Style::default()
        .fg(t.annotation_fg)
        .add_modifier(Modifier::ITALIC);

    for annotation in &exchange.annotations {
        for (i, wrapped) in wrap_text(annotation, bubble_width.saturating_sub(2))
            .into_iter()
            .enumerate()
        {
            let prefix = if i == 0 { "↪ " } else { "  " };
            lines.push(Line::from(vec![
                Span::styled(prefix.to_string(), Style::default().fg(t.accent)),
                Span::styled(wrapped, annotation_style),
            ]));
        }
    }

    for row in &exchange.source_rows {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        for hit in row {
            lines.push(Line::from(vec![
                Span::styled(
                    hit.label(),
                    Style::default()
                        .fg(t.card_header_fg)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {}", hit.score_label()),
                    Style::default().fg(t.card_score_fg),
                ),
            ]));

            // Snippet capped at two lines per card
            let snippet_width = bubble_width.saturating_sub(2);
            let wrapped = wrap_text(&hit.paragraph, snippet_width);
            let truncated = wrapped.len() > 2;
            for (i, snippet_line) in wrapped.into_iter().take(2).enumerate() {
                let text = if truncated && i == 1 {
                    format!("  {}…", snippet_line)
                } else {
                    format!("  {}", snippet_line)
                };
                lines.push(Line::from(Span::styled(
                    text,
                    Style::default().fg(t.card_text_fg),
                )));
            }
        }
    }

    if let Some(answer) = &exchange.answer {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        let time_label = exchange
            .started_at
            .map(format_time_ago)
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(
                "Agent",
                Style::default()
                    .fg(t.agent_label)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", time_label), Style::default().fg(t.dim_fg)),
        ]));

        for rendered in markdown::render_markdown(answer, bubble_width, Style::default(), t) {
            lines.push(bubble_line(rendered, bubble_width, t.agent_bubble_bg));
        }
    }
}

fn typing_indicator(frame_idx: usize, t: &Theme) -> Line<'static> {
    let mut spans = Vec::with_capacity(6);
    for i in 0..3 {
        let style = if i == frame_idx {
            Style::default().fg(t.pending_fg).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(t.dim_fg)
        };
        spans.push(Span::styled("●", style));
        if i < 2 {
            spans.push(Span::raw(" "));
        }
    }
    Line::from(spans)
}

/// Pad a content line into a full-width bubble with a background fill.
fn bubble_line(line: Line<'static>, bubble_width: usize, bg: Color) -> Line<'static> {
    let content_width = line.width();
    let mut spans: Vec<Span<'static>> = Vec::with_capacity(line.spans.len() + 2);
    spans.push(Span::styled(" ".to_string(), Style::default().bg(bg)));
    for mut span in line.spans {
        if span.style.bg.is_none() {
            span.style = span.style.bg(bg);
        }
        spans.push(span);
    }
    let right_pad = bubble_width.saturating_sub(content_width) + 1;
    spans.push(Span::styled(
        " ".repeat(right_pad),
        Style::default().bg(bg),
    ));
    Line::from(spans)
}

fn render_input_bar(frame: &mut Frame, app: &App, area: Rect) {
    let t = theme();

    let middle_line = if app.busy() {
        Line::from(Span::styled(
            " Waiting for the answer...",
            Style::default().fg(t.placeholder_fg),
        ))
    } else if app.input.is_empty() {
        Line::from(vec![
            Span::styled(" Ask anything...", Style::default().fg(t.placeholder_fg)),
            Span::styled(" ", Style::default().fg(t.input_bg).bg(t.accent)),
        ])
    } else {
        // Newlines in the input display as a return symbol on one line
        let chars: Vec<char> = app
            .input
            .chars()
            .map(|c| if c == '\n' { '⏎' } else { c })
            .collect();

        let before: String = chars[..app.cursor.min(chars.len())].iter().collect();
        let cursor_char = chars.get(app.cursor).copied().unwrap_or(' ');
        let after: String = if app.cursor + 1 < chars.len() {
            chars[app.cursor + 1..].iter().collect()
        } else {
            String::new()
        };

        Line::from(vec![
            Span::raw(" "),
            Span::raw(before),
            Span::styled(
                cursor_char.to_string(),
                Style::default().fg(t.input_bg).bg(t.accent),
            ),
            Span::raw(after),
        ])
    };

    let lines = vec![Line::from(""), middle_line, Line::from("")];
    let paragraph = Paragraph::new(lines).style(Style::default().bg(t.input_bg));
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let t = theme();
    let keycap = Style::default().bg(t.keycap_bg);
    let label = Style::default();
    let sep = Style::default().fg(t.separator_fg);

    let hints: Line = if let Some(ref msg) = app.status {
        Line::from(Span::styled(
            msg.clone(),
            Style::default().fg(t.notice_fg),
        ))
    } else {
        let mut spans = vec![
            Span::styled(" Enter ", keycap),
            Span::styled(" send ", label),
            Span::styled(" │ ", sep),
            Span::styled(" Alt+Enter ", keycap),
            Span::styled(" newline ", label),
        ];
        if app.transcript.last_answer().is_some() {
            spans.extend([
                Span::styled(" │ ", sep),
                Span::styled(" ^Y ", keycap),
                Span::styled(" copy answer ", label),
            ]);
        }
        spans.extend([
            Span::styled(" │ ", sep),
            Span::styled(" Esc ", keycap),
            Span::styled(" quit", label),
        ]);
        Line::from(spans)
    };

    let connection = if app.connected {
        Span::styled(" ● connected", Style::default().fg(t.online_fg))
    } else {
        Span::styled(" ○ reconnecting...", Style::default().fg(t.offline_fg))
    };

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(connection.width() as u16),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(hints), layout[0]);
    frame.render_widget(Paragraph::new(Line::from(connection)), layout[1]);
}

/// Word-wrap text to fit within max_width characters
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for line in text.lines() {
        // Empty or whitespace-only lines become blank lines
        if line.trim().is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        let mut current_width = 0;

        for word in line.split_whitespace() {
            let word_width = word.chars().count();

            if current_width == 0 {
                // First word on line
                if word_width > max_width {
                    // Word too long, force break it
                    for chunk in word.chars().collect::<Vec<_>>().chunks(max_width) {
                        result.push(chunk.iter().collect());
                    }
                } else {
                    current_line = word.to_string();
                    current_width = word_width;
                }
            } else if current_width + 1 + word_width <= max_width {
                // Word fits on current line
                current_line.push(' ');
                current_line.push_str(word);
                current_width += 1 + word_width;
            } else {
                // Word doesn't fit, start new line
                result.push(current_line);
                if word_width > max_width {
                    // Word too long, force break it
                    for chunk in word.chars().collect::<Vec<_>>().chunks(max_width) {
                        result.push(chunk.iter().collect());
                    }
                    current_line = String::new();
                    current_width = 0;
                } else {
                    current_line = word.to_string();
                    current_width = word_width;
                }
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }

    result
}

/// Format a timestamp as a human-readable "time ago" string
fn format_time_ago(timestamp: chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let duration = now.signed_duration_since(timestamp);

    if duration.num_minutes() < 1 {
        "just now".to_string()
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else {
        timestamp.format("%b %d").to_string()
    }
}
