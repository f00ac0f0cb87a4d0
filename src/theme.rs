use ratatui::style::{Color, Modifier, Style};

/// Colour tokens handed to every renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub title_text: Color,
    pub light_text: Color,
    pub tint: Color,
    pub cell_highlight: Color,
    pub separator: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            background: Color::Reset,
            text: Color::Gray,
            title_text: Color::White,
            light_text: Color::DarkGray,
            tint: Color::Rgb(0xff, 0x66, 0x00),
            cell_highlight: Color::Rgb(0x30, 0x30, 0x30),
            separator: Color::Rgb(0x3a, 0x3a, 0x3a),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color::Reset,
            text: Color::Black,
            title_text: Color::Black,
            light_text: Color::Gray,
            tint: Color::Rgb(0xff, 0x66, 0x00),
            cell_highlight: Color::Rgb(0xe8, 0xe8, 0xe8),
            separator: Color::Rgb(0xd0, 0xd0, 0xd0),
        }
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn comment_author_style(&self, collapsed: bool) -> Style {
        let style = Style::default().fg(self.title_text);
        if collapsed {
            style.add_modifier(Modifier::DIM | Modifier::ITALIC)
        } else {
            style.add_modifier(Modifier::BOLD)
        }
    }

    pub fn comment_date_style(&self, collapsed: bool) -> Style {
        let style = Style::default().fg(self.light_text);
        if collapsed {
            style.add_modifier(Modifier::DIM | Modifier::ITALIC)
        } else {
            style
        }
    }

    /// Background of a list row; selected and highlighted rows share it.
    pub fn row_style(&self, selected: bool) -> Style {
        if selected {
            Style::default().bg(self.cell_highlight)
        } else {
            Style::default().bg(self.background)
        }
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.tint)
    }
}

/// Parses `#rrggbb`.
pub fn parse_hex_color(val: &str) -> Option<Color> {
    let val = val.trim().trim_matches('"').trim_matches('\'');
    let hex = val.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff6600"), Some(Color::Rgb(255, 102, 0)));
        assert_eq!(parse_hex_color("'#0A0b0C'"), Some(Color::Rgb(10, 11, 12)));
        assert_eq!(parse_hex_color("ff6600"), None);
        assert_eq!(parse_hex_color("#ff66"), None);
        assert_eq!(parse_hex_color("#gg6600"), None);
    }

    #[test]
    fn test_collapsed_styles_are_dimmed() {
        let theme = Theme::dark();
        assert!(theme
            .comment_author_style(true)
            .add_modifier
            .contains(Modifier::DIM));
        assert!(!theme
            .comment_date_style(false)
            .add_modifier
            .contains(Modifier::DIM));
        assert_ne!(theme.row_style(true), theme.row_style(false));
    }
}
