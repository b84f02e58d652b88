//! Advisory results.
//!
//! Fatal failures travel as `Err(CoreError)`. Everything that must be logged
//! but must not abort the parent operation travels as a [`Warning`] inside an
//! [`Outcome`], so a degraded step can never be mistaken for a clean one.

use std::fmt;

/// Severity tag attached to every user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl Severity {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Fatal => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A non-fatal problem recorded by a named step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub step: String,
    pub message: String,
}

impl Warning {
    pub fn new(step: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            step: step.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

/// A value produced by a step that may have degraded along the way.
#[derive(Debug, Clone)]
#[must_use = "an Outcome may carry warnings that should be reported"]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    /// A result with no warnings.
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// A result carrying a single warning.
    pub fn degraded(value: T, warning: Warning) -> Self {
        Self {
            value,
            warnings: vec![warning],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Record another warning.
    pub fn warn(&mut self, step: impl Into<String>, message: impl fmt::Display) {
        let warning = Warning::new(step, message);
        tracing::warn!(step = %warning.step, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Fold another outcome's warnings into this one and return its value.
    pub fn absorb<U>(&mut self, other: Outcome<U>) -> U {
        self.warnings.extend(other.warnings);
        other.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }
}

impl<T: Default> Default for Outcome<T> {
    fn default() -> Self {
        Self::clean(T::default())
    }
}
