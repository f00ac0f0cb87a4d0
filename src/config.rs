use std::path::{Path, PathBuf};

use ratatui::style::Color;

use crate::source::PostType;
use crate::theme::{Theme, parse_hex_color};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeKind {
    #[default]
    Dark,
    Light,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub theme: ThemeKind,
    pub theme_color: Option<Color>,
    pub post_type: PostType,
    /// Columns of indentation per comment level.
    pub indent_unit: u16,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeKind::Dark,
            theme_color: None,
            post_type: PostType::News,
            indent_unit: 2,
            page_size: 30,
        }
    }
}

impl Config {
    /// `~/.config/hackers/hackers.conf`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/hackers/hackers.conf"))
    }

    /// Reads the config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "no config file, using defaults");
                Self::default()
            }
        }
    }

    /// Parses `key = value` lines. `#` starts a comment; unknown keys and bad
    /// values are skipped.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else {
                tracing::warn!(line, "ignoring config line without `=`");
                continue;
            };
            let key = key.trim();
            let val = val.trim().trim_matches('"').trim_matches('\'');
            if !config.set(key, val) {
                tracing::warn!(key, val, "ignoring bad config entry");
            }
        }
        config
    }

    fn set(&mut self, key: &str, val: &str) -> bool {
        match key {
            "theme" => match val {
                "dark" => self.theme = ThemeKind::Dark,
                "light" => self.theme = ThemeKind::Light,
                _ => return false,
            },
            "theme_color" => match parse_hex_color(val) {
                Some(color) => self.theme_color = Some(color),
                None => return false,
            },
            "post_type" => match val.parse() {
                Ok(post_type) => self.post_type = post_type,
                Err(_) => return false,
            },
            "indent_unit" => match val.parse::<u16>() {
                Ok(unit) if unit <= 8 => self.indent_unit = unit,
                _ => return false,
            },
            "page_size" => match val.parse::<usize>() {
                Ok(size) if (1..=100).contains(&size) => self.page_size = size,
                _ => return false,
            },
            _ => return false,
        }
        true
    }

    pub fn theme(&self) -> Theme {
        let base = match self.theme {
            ThemeKind::Dark => Theme::dark(),
            ThemeKind::Light => Theme::light(),
        };
        match self.theme_color {
            Some(tint) => base.with_tint(tint),
            None => base,
        }
    }
}
