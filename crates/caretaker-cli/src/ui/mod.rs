//! Terminal presentation.

pub mod output;
pub mod prompt;
pub mod table;
pub mod theme;

pub use output::Output;
pub use prompt::StdinPrompt;
pub use theme::Theme;
