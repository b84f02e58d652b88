//! Shared operation context.
//!
//! This module defines the `Context` struct, which groups the resolved
//! locations, configuration, and injected collaborators every engine needs.

use crate::config::Config;
use crate::exec::CommandRunner;
use crate::identity::Identity;
use crate::paths::Locations;
use crate::prompt::{FixedAnswer, Prompt};
use crate::reporter::{NullReporter, Reporter};
use crate::retry::RetryPolicy;
use std::fmt;
use std::sync::Arc;

/// Groups common state used during lifecycle operations.
#[derive(Clone)]
pub struct Context {
    pub locations: Locations,
    pub config: Config,
    pub identity: Identity,
    pub runner: Arc<dyn CommandRunner>,
    pub reporter: Arc<dyn Reporter>,
    pub prompt: Arc<dyn Prompt>,
    /// External calls are mocked; privileged helpers stay off.
    pub mock: bool,
    /// A terminal is attached, so `sudo` may ask for a password.
    pub interactive: bool,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("locations", &self.locations)
            .field("identity", &self.identity)
            .field("mock", &self.mock)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// A silent context that answers "yes" to every prompt.
    pub fn new(locations: Locations, config: Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            locations,
            config,
            identity: Identity::current(),
            runner,
            reporter: Arc::new(NullReporter),
            prompt: Arc::new(FixedAnswer(true)),
            mock: false,
            interactive: false,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Retry policy for flaky external tools.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_config(&self.config.retry)
    }
}
