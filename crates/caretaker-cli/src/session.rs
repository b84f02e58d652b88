//! Per-run setup: resolve locations, load configuration, and pick the
//! collaborators (command runner, prompt) the engines will use.

use crate::ui::{Output, StdinPrompt};
use anyhow::{Context as _, Result};
use caretaker_core::config::Config;
use caretaker_core::exec::{CommandRunner, MockRunner, SystemRunner};
use caretaker_core::location::ToolLocation;
use caretaker_core::prompt::{FixedAnswer, Prompt};
use caretaker_core::{Context, Locations};
use crossterm::tty::IsTty;
use std::sync::Arc;

/// How the process was asked to behave, read once from the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    /// Never read from stdin; the menu is suppressed.
    pub noninteractive: bool,
    /// Every confirmation is answered "yes".
    pub assume_yes: bool,
    /// External tools are answered by a mock instead of being spawned.
    pub mock: bool,
}

impl Mode {
    /// `CARETAKER_NONINTERACTIVE`, `CARETAKER_ASSUME_YES` and
    /// `CARETAKER_MOCK_EXTERNAL`, plus the `--yes` flag.
    pub fn from_env(assume_yes_flag: bool) -> Self {
        Self {
            noninteractive: env_flag("CARETAKER_NONINTERACTIVE"),
            assume_yes: assume_yes_flag || env_flag("CARETAKER_ASSUME_YES"),
            mock: env_flag("CARETAKER_MOCK_EXTERNAL"),
        }
    }

    /// Whether `sudo` may stop and ask for a password.
    fn can_ask_password(self) -> bool {
        !self.noninteractive && !self.mock && std::io::stdin().is_tty()
    }

    fn prompt(self) -> Arc<dyn Prompt> {
        if self.assume_yes {
            Arc::new(FixedAnswer(true))
        } else if self.noninteractive {
            Arc::new(FixedAnswer(false))
        } else {
            Arc::new(StdinPrompt)
        }
    }
}

/// Truthy values: `1`, `true`, `yes` (any case).
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| is_truthy(&v))
}

/// Everything a command handler needs.
#[derive(Debug, Clone)]
pub struct Session {
    pub ctx: Context,
    pub output: Arc<Output>,
    pub mode: Mode,
    pub location: ToolLocation,
}

impl Session {
    pub fn open(mode: Mode, locations: Locations) -> Result<Self> {
        let config = Config::load_from(&locations)
            .with_context(|| format!("Failed to load {}", locations.config_file().display()))?;
        let output = Arc::new(Output::new());

        let runner: Arc<dyn CommandRunner> = if mode.mock {
            Arc::new(mock_runner())
        } else {
            Arc::new(SystemRunner)
        };

        let ctx = Context::new(locations, config, runner)
            .with_reporter(output.clone())
            .with_prompt(mode.prompt())
            .with_mock(mode.mock)
            .with_interactive(mode.can_ask_password());

        Ok(Self {
            ctx,
            output,
            mode,
            location: ToolLocation::current(),
        })
    }
}

/// Runner for mock mode.
///
/// Unscripted tools succeed silently. When `CARETAKER_MOCK_VOLUME` names a
/// directory, `hdiutil attach` reports it as the mounted volume so an install
/// can run end to end without a real disk image.
fn mock_runner() -> MockRunner {
    let mock = MockRunner::new();
    if let Some(volume) = std::env::var_os("CARETAKER_MOCK_VOLUME") {
        let volume = volume.to_string_lossy().into_owned();
        mock.stdout(
            "hdiutil",
            &["attach"],
            &format!("/dev/disk9\tGUID_partition_scheme\t\n/dev/disk9s1\tApple_HFS\t{volume}\n"),
        );
    }
    mock
}
