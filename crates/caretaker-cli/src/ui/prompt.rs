//! Interactive confirmation on stdin.

use caretaker_core::prompt::Prompt;
use crossterm::style::Stylize;
use std::io::{BufRead, Write};

/// Asks on the terminal; anything but `y`/`yes` means no.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, question: &str) -> bool {
        print!("  {} {question} (y/N) ", "CONFIRM".bold().yellow());
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        if std::io::stdin().lock().read_line(&mut input).is_err() {
            return false;
        }
        is_yes(&input)
    }
}

pub fn is_yes(input: &str) -> bool {
    let answer = input.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
