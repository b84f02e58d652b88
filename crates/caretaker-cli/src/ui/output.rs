//! Severity-tagged terminal output.
//!
//! Every user-visible line starts with a tag (`INFO`, `WARN`, `ERROR`, `OK`)
//! so output stays readable when piped into a log.

use super::theme::Theme;
use caretaker_core::{Reporter, Severity};
use crossterm::style::Stylize;

#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    fn tagged(&self, tag: &str, color: crossterm::style::Color, msg: &str) {
        println!("  {} {msg}", format!("{tag:<5}").with(color).bold());
    }

    /// `label: value` line aligned to the theme's label column.
    pub fn field(&self, label: &str, value: &str) {
        println!(
            "  {:<width$}{value}",
            format!("{label}:"),
            width = self.theme.label_width
        );
    }

    /// A fatal error plus what to do about it.
    pub fn fatal(&self, msg: &str, hint: &str) {
        self.error(msg);
        println!("        {}", hint.with(self.theme.colors.secondary));
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        println!();
        println!("{} {}", title.with(self.theme.colors.header).bold(), "─".repeat(40).dark_grey());
    }

    fn step(&self, name: &str, detail: &str) {
        if detail.is_empty() {
            println!("  {}", name.with(self.theme.colors.secondary));
        } else {
            println!(
                "  {} {}",
                name.with(self.theme.colors.secondary),
                detail.dark_grey()
            );
        }
    }

    fn info(&self, msg: &str) {
        self.tagged(Severity::Info.tag(), self.theme.colors.info, msg);
    }

    fn success(&self, msg: &str) {
        self.tagged("OK", self.theme.colors.success, msg);
    }

    fn warning(&self, msg: &str) {
        self.tagged(Severity::Warning.tag(), self.theme.colors.warning, msg);
    }

    fn error(&self, msg: &str) {
        self.tagged(Severity::Fatal.tag(), self.theme.colors.error, msg);
    }
}
