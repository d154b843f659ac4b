use ratatui::style::Color;

/// Terminal theme colors, adapts to light/dark mode
pub struct Theme {
    /// Accent color (cursor, send hints)
    pub accent: Color,
    /// User message bubble background
    pub user_bubble_bg: Color,
    /// User label color (matches user bubble)
    pub user_label: Color,
    /// Agent message bubble background
    pub agent_bubble_bg: Color,
    /// Agent label color
    pub agent_label: Color,
    /// Rewritten-query annotation text
    pub annotation_fg: Color,
    /// Source card title ("Source #1")
    pub card_header_fg: Color,
    /// Source card relevance score
    pub card_score_fg: Color,
    /// Source card snippet text
    pub card_text_fg: Color,
    /// Plain notice messages (errors, connection problems)
    pub notice_fg: Color,
    /// Typing indicator dots
    pub pending_fg: Color,
    /// Input bar background
    pub input_bg: Color,
    /// Placeholder text color
    pub placeholder_fg: Color,
    /// Dim text (status bar, timestamps)
    pub dim_fg: Color,
    /// Keycap background in status bar
    pub keycap_bg: Color,
    /// Separator color
    pub separator_fg: Color,
    /// Connection indicator when online
    pub online_fg: Color,
    /// Connection indicator while reconnecting
    pub offline_fg: Color,
    /// Markdown heading text
    pub heading_fg: Color,
    /// Markdown code block text
    pub code_fg: Color,
    /// Markdown code block background
    pub code_bg: Color,
    /// Markdown inline code text
    pub inline_code_fg: Color,
    /// Markdown inline code background
    pub inline_code_bg: Color,
    /// Markdown list bullet
    pub bullet_fg: Color,
    /// Muted markdown chrome (fences, heading markers)
    pub muted_fg: Color,
}

impl Theme {
    pub fn detect() -> Self {
        if detect_light_theme() {
            Self::light()
        } else {
            Self::dark()
        }
    }

    pub fn dark() -> Self {
        Self {
            accent: Color::Cyan,
            user_bubble_bg: Color::Rgb(30, 45, 55), // subtle cyan tint
            user_label: Color::Rgb(80, 180, 220),
            agent_bubble_bg: Color::Rgb(40, 40, 46),
            agent_label: Color::Rgb(170, 140, 255),
            annotation_fg: Color::Rgb(140, 140, 150),
            card_header_fg: Color::Rgb(80, 180, 220),
            card_score_fg: Color::Rgb(120, 120, 130),
            card_text_fg: Color::Rgb(160, 160, 165),
            notice_fg: Color::Rgb(230, 130, 100),
            pending_fg: Color::Rgb(150, 150, 155),
            input_bg: Color::Rgb(30, 30, 35),
            placeholder_fg: Color::Rgb(100, 100, 100),
            dim_fg: Color::Rgb(100, 100, 100),
            keycap_bg: Color::Rgb(60, 60, 65),
            separator_fg: Color::Rgb(60, 60, 65),
            online_fg: Color::Rgb(80, 200, 120),
            offline_fg: Color::Rgb(220, 170, 60),
            heading_fg: Color::Rgb(120, 190, 240),
            code_fg: Color::Rgb(210, 210, 215),
            code_bg: Color::Rgb(25, 25, 30),
            inline_code_fg: Color::Rgb(220, 180, 120),
            inline_code_bg: Color::Rgb(50, 50, 56),
            bullet_fg: Color::Rgb(80, 180, 220),
            muted_fg: Color::Rgb(110, 110, 120),
        }
    }

    pub fn light() -> Self {
        Self {
            accent: Color::Rgb(0, 150, 180),
            user_bubble_bg: Color::Rgb(220, 235, 245), // subtle cyan tint
            user_label: Color::Rgb(40, 130, 180),
            agent_bubble_bg: Color::Rgb(235, 235, 240),
            agent_label: Color::Rgb(110, 80, 200),
            annotation_fg: Color::Rgb(120, 120, 130),
            card_header_fg: Color::Rgb(40, 130, 180),
            card_score_fg: Color::Rgb(130, 130, 140),
            card_text_fg: Color::Rgb(90, 90, 95),
            notice_fg: Color::Rgb(190, 80, 50),
            pending_fg: Color::Rgb(130, 130, 140),
            input_bg: Color::Rgb(235, 235, 240),
            placeholder_fg: Color::Rgb(150, 150, 150),
            dim_fg: Color::Rgb(140, 140, 140),
            keycap_bg: Color::Rgb(200, 200, 205),
            separator_fg: Color::Rgb(195, 195, 200),
            online_fg: Color::Rgb(30, 140, 70),
            offline_fg: Color::Rgb(180, 120, 0),
            heading_fg: Color::Rgb(20, 100, 160),
            code_fg: Color::Rgb(50, 50, 55),
            code_bg: Color::Rgb(225, 225, 230),
            inline_code_fg: Color::Rgb(150, 100, 30),
            inline_code_bg: Color::Rgb(220, 220, 225),
            bullet_fg: Color::Rgb(40, 130, 180),
            muted_fg: Color::Rgb(130, 130, 140),
        }
    }
}

/// Detect if terminal has a light background.
/// Checks the COLORFGBG env var (format: "fg;bg" where 15=white, 0=black);
/// defaults to dark, the common case for developer terminals.
fn detect_light_theme() -> bool {
    if let Ok(val) = std::env::var("COLORFGBG") {
        if let Some(bg) = val.split(';').next_back() {
            if let Ok(bg_num) = bg.parse::<u8>() {
                return bg_num >= 7;
            }
        }
    }
    false
}
