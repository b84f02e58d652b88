//! Colors and severity tags shared by every command.

use crossterm::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: ColorScheme,
    /// Width of the label column in key/value listings.
    pub label_width: usize,
}

#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub secondary: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: ColorScheme {
                header: Color::White,
                info: Color::Blue,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                secondary: Color::DarkGrey,
            },
            label_width: 24,
        }
    }
}
