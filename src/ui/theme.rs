// src/ui/theme.rs

use crossterm::style::{Color, Stylize};
use std::fmt::Display;

/// Colors used by the terminal output, one per role. A disabled theme emits
/// plain text, which is what tests and `--no-color` use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub enabled: bool,
    pub checking: Color,
    pub transfer: Color,
    pub success: Color,
    pub deleted: Color,
    pub failure: Color,
    pub heading: Color,
    pub elapsed: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            enabled: true,
            checking: Color::Blue,
            transfer: Color::Cyan,
            success: Color::Green,
            deleted: Color::Yellow,
            failure: Color::Red,
            heading: Color::Magenta,
            elapsed: Color::Blue,
        }
    }
}

impl Theme {
    pub fn plain() -> Self {
        Theme {
            enabled: false,
            ..Theme::default()
        }
    }

    pub fn paint(&self, text: impl Display, color: Color) -> String {
        if self.enabled {
            text.to_string().with(color).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: impl Display) -> String {
        if self.enabled {
            text.to_string().bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn dim(&self, text: impl Display) -> String {
        if self.enabled {
            text.to_string().dim().to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_theme_emits_no_escapes() {
        let theme = Theme::plain();
        assert_eq!(theme.paint("ok", theme.success), "ok");
        assert_eq!(theme.bold("Files:"), "Files:");
        assert_eq!(theme.dim(42), "42");
    }

    #[test]
    fn test_colored_theme_wraps_text() {
        let theme = Theme::default();
        assert!(theme.paint("ok", theme.success).contains("ok"));
        assert!(theme.bold("Files:").len() > "Files:".len());
    }
}
