//! Confirmation prompts.

pub trait Prompt: Send + Sync {
    /// Ask a yes/no question; `true` means proceed.
    fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way (non-interactive mode, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompt for FixedAnswer {
    fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "auto-answered prompt");
        self.0
    }
}
