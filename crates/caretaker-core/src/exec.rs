//! External command execution.
//!
//! Every macOS tool the engines call (`hdiutil`, `sysctl`, `defaults`, `pgrep`,
//! `git`, package managers, ...) goes through a [`CommandRunner`]. The CLI
//! plugs in [`SystemRunner`]; tests and the mock mode plug in [`MockRunner`].

use crate::error::{CoreError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Wrap in non-interactive `sudo` unless `already_root`.
    pub fn elevated(self, already_root: bool) -> Self {
        if already_root {
            return self;
        }
        let mut args = vec!["-n".to_string(), self.program];
        args.extend(self.args);
        Self {
            program: "sudo".to_string(),
            args,
            cwd: self.cwd,
        }
    }

    /// Whether this invocation targets `program` with arguments starting with `prefix`.
    pub fn matches(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short description of a failure for error messages.
    pub fn failure_summary(&self) -> String {
        let stderr = self.stderr.trim();
        match (self.status, stderr.is_empty()) {
            (Some(code), true) => format!("exit status {code}"),
            (Some(code), false) => format!("exit status {code}: {stderr}"),
            (None, _) => "terminated by signal".to_string(),
        }
    }
}

pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run to completion.
    ///
    /// A non-zero exit is `Ok` with the status recorded; `Err` means the
    /// process could not be spawned at all (e.g. the tool is not installed).
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;

    /// Run and turn both spawn failures and non-zero exits into errors.
    fn run_checked(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let output = self
            .run(invocation)
            .map_err(|e| CoreError::command(&invocation.program, e))?;
        if output.success() {
            Ok(output)
        } else {
            Err(CoreError::command(
                invocation.to_string(),
                output.failure_summary(),
            ))
        }
    }
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        tracing::debug!(command = %invocation, "exec");
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            tracing::debug!(command = %invocation, status = ?result.status, "non-zero exit");
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(CommandOutput),
    NotFound,
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    prefix: Vec<String>,
    response: Scripted,
    remaining: Option<usize>,
}

/// Records every invocation and answers from a script.
///
/// Unscripted commands succeed with empty output. Later rules take
/// precedence over earlier ones, so a test can override a default.
#[derive(Debug, Default)]
pub struct MockRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, program: &str, prefix: &[&str], response: Scripted, remaining: Option<usize>) {
        let rule = Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(ToString::to_string).collect(),
            response,
            remaining,
        };
        self.rules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(rule);
    }

    /// Answer matching invocations with `output`.
    pub fn respond(&self, program: &str, prefix: &[&str], output: CommandOutput) -> &Self {
        self.push(program, prefix, Scripted::Output(output), None);
        self
    }

    /// Answer only the next matching invocation with `output`.
    pub fn respond_once(&self, program: &str, prefix: &[&str], output: CommandOutput) -> &Self {
        self.push(program, prefix, Scripted::Output(output), Some(1));
        self
    }

    /// Shorthand for a successful response with the given stdout.
    pub fn stdout(&self, program: &str, prefix: &[&str], stdout: &str) -> &Self {
        self.respond(program, prefix, CommandOutput::ok(stdout))
    }

    /// Shorthand for a non-zero exit.
    pub fn fail(&self, program: &str, prefix: &[&str], code: i32, stderr: &str) -> &Self {
        self.respond(program, prefix, CommandOutput::failed(code, stderr))
    }

    /// Pretend `program` is not installed.
    pub fn missing(&self, program: &str) -> &Self {
        self.push(program, &[], Scripted::NotFound, None);
        self
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Invocations of one program.
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    pub fn was_called(&self, program: &str, prefix: &[&str]) -> bool {
        self.calls().iter().any(|c| c.matches(program, prefix))
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        tracing::debug!(command = %invocation, "mock exec");
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(invocation.clone());

        let mut rules = self
            .rules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let rule_matches = |r: &Rule| -> bool {
            let prefix: Vec<&str> = r.prefix.iter().map(String::as_str).collect();
            invocation.matches(&r.program, &prefix)
        };
        let Some(idx) = rules
            .iter()
            .rposition(|r| r.remaining != Some(0) && rule_matches(r))
        else {
            return Ok(CommandOutput::ok(""));
        };

        let rule = &mut rules[idx];
        if let Some(n) = rule.remaining.as_mut() {
            *n -= 1;
        }
        match &rule.response {
            Scripted::Output(out) => Ok(out.clone()),
            Scripted::NotFound => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{}: command not found", invocation.program),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevated_prefixes_sudo() {
        let inv = Invocation::new("chown").args(["-R", "me:staff", "/x"]);
        let sudo = inv.clone().elevated(false);
        assert_eq!(sudo.program, "sudo");
        assert_eq!(sudo.args, vec!["-n", "chown", "-R", "me:staff", "/x"]);
        assert_eq!(inv.clone().elevated(true), inv);
    }

    #[test]
    fn test_display_quotes_spaces() {
        let inv = Invocation::new("git").args(["commit", "-m", "Initial skeleton"]);
        assert_eq!(inv.to_string(), "git commit -m \"Initial skeleton\"");
    }

    #[test]
    fn test_mock_last_rule_wins_and_once_expires() {
        let mock = MockRunner::new();
        mock.stdout("sysctl", &["-n"], "Apple M1");
        mock.respond_once("sysctl", &["-n"], CommandOutput::ok("Apple M3"));

        let inv = Invocation::new("sysctl").args(["-n", "machdep.cpu.brand_string"]);
        assert_eq!(mock.run(&inv).unwrap().stdout, "Apple M3");
        assert_eq!(mock.run(&inv).unwrap().stdout, "Apple M1");
        assert_eq!(mock.calls_to("sysctl").len(), 2);
    }

    #[test]
    fn test_mock_missing_and_default() {
        let mock = MockRunner::new();
        mock.missing("conda");
        assert!(mock.run(&Invocation::new("conda")).is_err());
        assert!(mock.run(&Invocation::new("git")).unwrap().success());
    }

    #[test]
    fn test_run_checked_reports_failure() {
        let mock = MockRunner::new();
        mock.fail("hdiutil", &["verify"], 1, "checksum mismatch");
        let err = mock
            .run_checked(&Invocation::new("hdiutil").arg("verify"))
            .unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
