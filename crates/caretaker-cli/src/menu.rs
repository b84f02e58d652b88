//! Numbered interactive menu.
//!
//! Each choice runs the same handler as the matching subcommand. A failing
//! action is reported and the menu comes back; only "Exit" or end of input
//! leaves the loop.

use crate::Exit;
use crate::cmd;
use crate::session::Session;
use anyhow::Result;
use caretaker_core::Reporter;
use caretaker_core::uninstall::UninstallOptions;
use caretaker_schema::Toolchain;
use crossterm::style::Stylize;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Uninstall,
    CleanInstall,
    Optimize,
    Project,
    SelfTests,
    Repair,
    Shortcut,
    Exit,
}

impl MenuItem {
    /// In display order; the number shown is the index plus one.
    pub const ALL: [Self; 8] = [
        Self::Uninstall,
        Self::CleanInstall,
        Self::Optimize,
        Self::Project,
        Self::SelfTests,
        Self::Repair,
        Self::Shortcut,
        Self::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Uninstall => "Uninstall",
            Self::CleanInstall => "Clean install",
            Self::Optimize => "Optimize performance",
            Self::Project => "Set up a project environment",
            Self::SelfTests => "Run self-tests",
            Self::Repair => "Repair shared configuration",
            Self::Shortcut => "Create desktop shortcut",
            Self::Exit => "Exit",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let n: usize = input.trim().parse().ok()?;
        Self::ALL.get(n.checked_sub(1)?).copied()
    }
}

pub fn run(session: &Session) -> Result<Exit> {
    let stdin = std::io::stdin();
    run_with(session, &mut stdin.lock())
}

/// The menu loop over any line source. Returns the exit of the last action.
pub fn run_with(session: &Session, input: &mut impl BufRead) -> Result<Exit> {
    let mut last = Exit::Success;
    loop {
        print_menu(session);
        let Some(line) = read_line(input, &format!("Select an option [1-{}]:", MenuItem::ALL.len()))?
        else {
            return Ok(last);
        };
        let Some(item) = MenuItem::parse(&line) else {
            session.output.warning(&format!("'{}' is not a menu option", line.trim()));
            continue;
        };

        let result = match item {
            MenuItem::Exit => return Ok(last),
            MenuItem::Uninstall => {
                cmd::uninstall::uninstall(session, UninstallOptions::default(), false)
            }
            MenuItem::CleanInstall => cmd::install::install(session, None, true),
            MenuItem::Optimize => cmd::optimize::optimize(session),
            MenuItem::Project => ask_project(session, input),
            MenuItem::SelfTests => cmd::selftest::self_test(session),
            MenuItem::Repair => cmd::repair::repair(session),
            MenuItem::Shortcut => cmd::shortcut::shortcut(session),
        };

        last = match result {
            Ok(exit) => exit,
            Err(e) => {
                session.output.error(&format!("{e:#}"));
                Exit::Aborted
            }
        };
    }
}

fn ask_project(session: &Session, input: &mut impl BufRead) -> Result<Exit> {
    let defaults = &session.ctx.config.project;
    let name = read_line(input, &format!("Project name [{}]:", defaults.default_name))?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let names: Vec<&str> = Toolchain::ALL.iter().map(|t| t.as_str()).collect();
    let answer = read_line(
        input,
        &format!("Toolchain ({}) [{}]:", names.join(", "), defaults.default_toolchain),
    )?
    .unwrap_or_default();

    let toolchain = match answer.trim() {
        "" => None,
        other => Some(other.parse::<Toolchain>()?),
    };
    cmd::project::project(session, name, toolchain)
}

fn print_menu(session: &Session) {
    session
        .output
        .section(&format!("{} lifecycle manager", session.ctx.config.app.name));
    for (i, item) in MenuItem::ALL.iter().enumerate() {
        println!("  {} {}", format!("{}.", i + 1).bold(), item.label());
    }
}

/// Prompt and read one line; `None` at end of input.
fn read_line(input: &mut impl BufRead, prompt: &str) -> Result<Option<String>> {
    print!("  {prompt} ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Mode;
    use caretaker_core::Locations;
    use std::io::Cursor;

    fn sandbox_session(base: &std::path::Path) -> Session {
        let mode = Mode {
            noninteractive: true,
            assume_yes: true,
            mock: true,
        };
        Session::open(mode, Locations::rooted_at(base)).unwrap()
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!(MenuItem::parse("1"), Some(MenuItem::Uninstall));
        assert_eq!(MenuItem::parse(" 8\n"), Some(MenuItem::Exit));
        assert_eq!(MenuItem::parse("0"), None);
        assert_eq!(MenuItem::parse("9"), None);
        assert_eq!(MenuItem::parse("exit"), None);
    }

    #[test]
    fn test_invalid_choice_then_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let session = sandbox_session(tmp.path());
        let exit = run_with(&session, &mut Cursor::new("42\n8\n")).unwrap();
        assert_eq!(exit, Exit::Success);
    }

    #[test]
    fn test_end_of_input_leaves_menu() {
        let tmp = tempfile::tempdir().unwrap();
        let session = sandbox_session(tmp.path());
        assert_eq!(run_with(&session, &mut Cursor::new("")).unwrap(), Exit::Success);
    }

    #[test]
    fn test_repair_from_menu_creates_shared_state() {
        let tmp = tempfile::tempdir().unwrap();
        let session = sandbox_session(tmp.path());
        run_with(&session, &mut Cursor::new("6\n8\n")).unwrap();
        assert!(session.ctx.locations.settings_path().is_file());
    }

    #[test]
    fn test_project_from_menu_uses_answers() {
        let tmp = tempfile::tempdir().unwrap();
        let session = sandbox_session(tmp.path());
        let exit = run_with(&session, &mut Cursor::new("4\nweb-app\nnode\n8\n")).unwrap();
        assert_eq!(exit, Exit::Success);
        let root = session.ctx.locations.projects_dir().join("web-app");
        assert!(root.join("package.json").is_file());
    }

    #[test]
    fn test_missing_image_from_menu_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let session = sandbox_session(tmp.path());
        let exit = run_with(&session, &mut Cursor::new("2\n8\n")).unwrap();
        assert_eq!(exit, Exit::Aborted);
    }
}
