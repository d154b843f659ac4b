//! Markdown rendering for answer bubbles.
//!
//! Supports the subset streamed answers actually use: headings, bold,
//! italic, inline code, fenced code blocks, and unordered list bullets.
//! Everything else renders as plain text. Input is sanitized before any
//! styling so remote text cannot smuggle terminal escape sequences into
//! the output buffer.

use crate::theme::Theme;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

/// Strip ANSI escape sequences and control characters from untrusted text.
/// Newlines and tabs survive; carriage returns collapse to newlines.
pub fn sanitize_remote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_escape = false;
    let mut in_csi = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_escape {
            if in_csi {
                // CSI sequences terminate on a byte in 0x40..0x7E.
                if ('@'..='~').contains(&ch) {
                    in_escape = false;
                    in_csi = false;
                }
                continue;
            }
            if ch == '[' {
                in_csi = true;
                continue;
            }
            in_escape = false;
            continue;
        }

        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }

        if ch == '\r' {
            // CRLF collapses to the LF that follows; a bare CR becomes LF.
            if chars.peek() != Some(&'\n') {
                out.push('\n');
            }
            continue;
        }

        if ch.is_control() && ch != '\n' && ch != '\t' {
            continue;
        }

        out.push(ch);
    }

    out
}

/// Render markdown into lines wrapped to `max_width`, styled from the
/// theme. Each call re-renders the whole string; the caller replaces the
/// bubble content wholesale.
pub fn render_markdown(
    text: &str,
    max_width: usize,
    base_style: Style,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let text = sanitize_remote_text(text);
    let max_width = max_width.max(1);

    let heading_style = Style::default()
        .fg(theme.heading_fg)
        .add_modifier(Modifier::BOLD);
    let bold_style = base_style.add_modifier(Modifier::BOLD);
    let italic_style = base_style.add_modifier(Modifier::ITALIC);
    let inline_code_style = Style::default()
        .fg(theme.inline_code_fg)
        .bg(theme.inline_code_bg);
    let code_block_style = Style::default().fg(theme.code_fg).bg(theme.code_bg);
    let bullet_style = base_style.fg(theme.bullet_fg);
    let muted_style = Style::default().fg(theme.muted_fg);

    let mut result: Vec<Line<'static>> = Vec::new();
    let mut in_code_block = false;

    for line in text.split('\n') {
        let trimmed = line.trim();

        // Fence lines toggle code mode and render as a separator.
        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            let lang = trimmed.trim_start_matches('`').trim();
            if lang.is_empty() {
                result.push(Line::from(Span::styled("───".to_string(), muted_style)));
            } else {
                result.push(Line::from(vec![
                    Span::styled("─── ".to_string(), muted_style),
                    Span::styled(
                        lang.to_string(),
                        muted_style.add_modifier(Modifier::ITALIC),
                    ),
                ]));
            }
            continue;
        }

        if in_code_block {
            result.extend(chunk_preformatted(line, code_block_style, max_width));
            continue;
        }

        if trimmed.is_empty() {
            result.push(Line::from(String::new()));
            continue;
        }

        // Headings
        if trimmed.starts_with('#') {
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            let heading_text = trimmed[level..].trim_start();
            let spans = vec![
                Span::styled("#".repeat(level) + " ", muted_style),
                Span::styled(heading_text.to_string(), heading_style),
            ];
            result.extend(wrap_spans(&spans, max_width));
            continue;
        }

        // Unordered list bullets
        if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
            let mut spans = vec![Span::styled("• ".to_string(), bullet_style)];
            spans.extend(render_inline(
                &trimmed[2..],
                base_style,
                bold_style,
                italic_style,
                inline_code_style,
            ));
            result.extend(wrap_spans(&spans, max_width));
            continue;
        }

        let spans = render_inline(
            line,
            base_style,
            bold_style,
            italic_style,
            inline_code_style,
        );
        result.extend(wrap_spans(&spans, max_width));
    }

    if result.is_empty() {
        result.push(Line::from(String::new()));
    }

    result
}

/// Parse inline markdown: `**bold**`, `*italic*`, `` `code` ``.
fn render_inline(
    text: &str,
    base_style: Style,
    bold_style: Style,
    italic_style: Style,
    code_style: Style,
) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut buf = String::new();
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut i = 0;

    let flush = |buf: &mut String, spans: &mut Vec<Span<'static>>| {
        if !buf.is_empty() {
            spans.push(Span::styled(std::mem::take(buf), base_style));
        }
    };

    while i < len {
        // Inline code: `...`
        if chars[i] == '`' {
            let start = i + 1;
            if let Some(end) = chars[start..].iter().position(|&c| c == '`') {
                flush(&mut buf, &mut spans);
                let code: String = chars[start..start + end].iter().collect();
                spans.push(Span::styled(code, code_style));
                i = start + end + 1;
            } else {
                buf.push('`');
                i += 1;
            }
            continue;
        }

        // Bold: **...**
        if i + 1 < len && chars[i] == '*' && chars[i + 1] == '*' {
            let start = i + 2;
            let mut end = None;
            for j in start..len.saturating_sub(1) {
                if chars[j] == '*' && chars[j + 1] == '*' {
                    end = Some(j);
                    break;
                }
            }
            if let Some(end) = end {
                flush(&mut buf, &mut spans);
                let bold: String = chars[start..end].iter().collect();
                spans.push(Span::styled(bold, bold_style));
                i = end + 2;
            } else {
                buf.push_str("**");
                i += 2;
            }
            continue;
        }

        // Italic: *...*
        if chars[i] == '*' {
            let start = i + 1;
            if let Some(end) = chars[start..].iter().position(|&c| c == '*') {
                flush(&mut buf, &mut spans);
                let italic: String = chars[start..start + end].iter().collect();
                spans.push(Span::styled(italic, italic_style));
                i = start + end + 1;
            } else {
                buf.push('*');
                i += 1;
            }
            continue;
        }

        buf.push(chars[i]);
        i += 1;
    }

    flush(&mut buf, &mut spans);
    spans
}

/// Word-wrap styled spans to `max_width` columns. Whitespace collapses to
/// single spaces; words longer than the width are force-broken.
fn wrap_spans(spans: &[Span<'static>], max_width: usize) -> Vec<Line<'static>> {
    let max_width = max_width.max(1);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for span in spans {
        let style = span.style;
        for word in span.content.split_whitespace() {
            let word_width = word.chars().count();
            let sep = usize::from(current_width > 0);

            if current_width + sep + word_width <= max_width {
                if sep == 1 {
                    current.push(Span::styled(" ".to_string(), style));
                }
                current.push(Span::styled(word.to_string(), style));
                current_width += sep + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
            }

            if word_width > max_width {
                // Force-break an overlong word.
                let chars: Vec<char> = word.chars().collect();
                for chunk in chars.chunks(max_width) {
                    let piece: String = chunk.iter().collect();
                    let piece_width = piece.chars().count();
                    if piece_width == max_width {
                        lines.push(Line::from(Span::styled(piece, style)));
                    } else {
                        current.push(Span::styled(piece, style));
                        current_width = piece_width;
                    }
                }
            } else {
                current.push(Span::styled(word.to_string(), style));
                current_width = word_width;
            }
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    if lines.is_empty() {
        lines.push(Line::from(String::new()));
    }
    lines
}

/// Break a preformatted line into width-sized pieces, preserving internal
/// whitespace (word-wrapping would mangle code indentation).
fn chunk_preformatted(line: &str, style: Style, max_width: usize) -> Vec<Line<'static>> {
    if line.is_empty() {
        return vec![Line::from(Span::styled(" ".to_string(), style))];
    }
    let chars: Vec<char> = line.chars().collect();
    chars
        .chunks(max_width.max(1))
        .map(|chunk| Line::from(Span::styled(chunk.iter().collect::<String>(), style)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str, width: usize) -> Vec<String> {
        render_markdown(text, width, Style::default(), &Theme::dark())
            .iter()
            .map(line_text)
            .collect()
    }

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_plain_text_wraps() {
        assert_eq!(plain("It will be sunny.", 40), vec!["It will be sunny."]);
        assert_eq!(
            plain("one two three four", 9),
            vec!["one two", "three", "four"]
        );
    }

    #[test]
    fn test_blank_lines_survive() {
        assert_eq!(plain("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_overlong_word_is_force_broken() {
        assert_eq!(plain("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_bold_and_code_spans() {
        let lines = render_markdown("a **b** `c`", 40, Style::default(), &Theme::dark());
        assert_eq!(lines.len(), 1);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "b")
            .expect("bold span");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        let theme = Theme::dark();
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "c")
            .expect("code span");
        assert_eq!(code.style.bg, Some(theme.inline_code_bg));
    }

    #[test]
    fn test_unmatched_markers_render_literally() {
        assert_eq!(plain("2 ** 3 is `eight", 40), vec!["2 ** 3 is `eight"]);
    }

    #[test]
    fn test_bullets() {
        assert_eq!(plain("- first\n- second", 20), vec!["• first", "• second"]);
    }

    #[test]
    fn test_heading() {
        assert_eq!(plain("## Forecast", 20), vec!["## Forecast"]);
    }

    #[test]
    fn test_fenced_code_preserves_indentation() {
        let lines = plain("```\n  indented\n```", 40);
        assert_eq!(lines, vec!["───", "  indented", "───"]);
    }

    #[test]
    fn test_sanitize_strips_escapes() {
        assert_eq!(
            sanitize_remote_text("red \u{1b}[31mtext\u{1b}[0m here"),
            "red text here"
        );
        assert_eq!(sanitize_remote_text("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(sanitize_remote_text("bell\u{7}"), "bell");
        assert_eq!(sanitize_remote_text("tab\tand\nnewline"), "tab\tand\nnewline");
    }

    #[test]
    fn test_markdown_input_is_sanitized() {
        let lines = plain("safe \u{1b}[2Jtext", 40);
        assert_eq!(lines, vec!["safe text"]);
    }
}
