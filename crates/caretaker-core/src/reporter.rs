//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use crate::outcome::Warning;

pub trait Reporter: Send + Sync {
    /// Indicates a new section has started (e.g. "Clean install").
    fn section(&self, title: &str);

    /// A state machine entered a new step (e.g. "Mounting").
    fn step(&self, name: &str, detail: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display every warning collected by an advisory step.
    fn warnings(&self, warnings: &[Warning]) {
        for w in warnings {
            self.warning(&w.to_string());
        }
    }
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn step(&self, name: &str, detail: &str) {
        (**self).step(name, detail)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
}

/// A no-op reporter for silent operations (e.g., verification, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn step(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_reporter_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullReporter>();
    }

    #[test]
    fn null_reporter_implements_all_methods() {
        let reporter = NullReporter;
        reporter.section("test");
        reporter.step("Mounting", "/tmp/x.dmg");
        reporter.info("info");
        reporter.success("success");
        reporter.warning("warning");
        reporter.error("error");
        reporter.warnings(&[Warning::new("step", "msg")]);
    }
}
