use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    // Used to pick a matching syntax theme
    pub background_color: Color,

    pub text_style: Style,
    pub heading_color: Color,
    pub link_style: Style,
    pub inline_code_style: Style,
    pub blockquote_style: Style,
    pub list_marker_style: Style,

    // Code blocks
    pub codeblock_text_style: Style,
    pub codeblock_bg: Option<Color>,
    pub codeblock_header_style: Style,
    pub copy_hint_style: Style,
    pub copied_style: Style,

    // Collapse chrome
    pub muted_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Rgb(24, 24, 27),
            text_style: Style::default().fg(Color::Rgb(228, 228, 231)),
            heading_color: Color::Rgb(250, 250, 250),
            link_style: Style::default()
                .fg(Color::Rgb(96, 165, 250))
                .add_modifier(Modifier::UNDERLINED),
            inline_code_style: Style::default()
                .fg(Color::Rgb(253, 186, 116))
                .bg(Color::Rgb(39, 39, 42)),
            blockquote_style: Style::default()
                .fg(Color::Rgb(161, 161, 170))
                .add_modifier(Modifier::ITALIC),
            list_marker_style: Style::default().fg(Color::Rgb(161, 161, 170)),

            codeblock_text_style: Style::default().fg(Color::Rgb(212, 212, 216)),
            codeblock_bg: Some(Color::Rgb(40, 44, 52)),
            codeblock_header_style: Style::default()
                .fg(Color::Rgb(161, 161, 170))
                .bg(Color::Rgb(55, 60, 70)),
            copy_hint_style: Style::default()
                .fg(Color::Rgb(209, 213, 219))
                .bg(Color::Rgb(55, 60, 70)),
            copied_style: Style::default()
                .fg(Color::Rgb(134, 239, 172))
                .bg(Color::Rgb(55, 60, 70))
                .add_modifier(Modifier::BOLD),

            muted_style: Style::default().fg(Color::Rgb(113, 113, 122)),
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::Rgb(250, 250, 250),
            text_style: Style::default().fg(Color::Rgb(24, 24, 27)),
            heading_color: Color::Rgb(9, 9, 11),
            link_style: Style::default()
                .fg(Color::Rgb(37, 99, 235))
                .add_modifier(Modifier::UNDERLINED),
            inline_code_style: Style::default()
                .fg(Color::Rgb(154, 52, 18))
                .bg(Color::Rgb(244, 244, 245)),
            blockquote_style: Style::default()
                .fg(Color::Rgb(82, 82, 91))
                .add_modifier(Modifier::ITALIC),
            list_marker_style: Style::default().fg(Color::Rgb(82, 82, 91)),

            codeblock_text_style: Style::default().fg(Color::Rgb(39, 39, 42)),
            codeblock_bg: Some(Color::Rgb(244, 244, 245)),
            codeblock_header_style: Style::default()
                .fg(Color::Rgb(82, 82, 91))
                .bg(Color::Rgb(228, 228, 231)),
            copy_hint_style: Style::default()
                .fg(Color::Rgb(39, 39, 42))
                .bg(Color::Rgb(228, 228, 231)),
            copied_style: Style::default()
                .fg(Color::Rgb(21, 128, 61))
                .bg(Color::Rgb(228, 228, 231))
                .add_modifier(Modifier::BOLD),

            muted_style: Style::default().fg(Color::Rgb(113, 113, 122)),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dark" | "default" | "default-dark" => Self::dark_default(),
            "light" => Self::light(),
            other => {
                tracing::warn!(theme = other, "unknown theme; using dark");
                Self::dark_default()
            }
        }
    }

    pub fn md_heading_style(&self, level: u8) -> Style {
        let base = Style::default()
            .fg(self.heading_color)
            .add_modifier(Modifier::BOLD);
        match level {
            1 => base.add_modifier(Modifier::UNDERLINED),
            2 | 3 => base,
            _ => base.remove_modifier(Modifier::BOLD),
        }
    }

    /// Code block text style with the block background applied.
    pub fn md_codeblock_style(&self) -> Style {
        match self.codeblock_bg {
            Some(bg) => self.codeblock_text_style.bg(bg),
            None => self.codeblock_text_style,
        }
    }
}
