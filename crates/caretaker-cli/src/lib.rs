//! caretaker - lifecycle manager for a macOS desktop application
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Installs the application from its disk image, tunes it for the machine's
//! hardware, removes it again with a residue sweep, and scaffolds project
//! environments that open in it.
//!
//! # Shared state
//!
//! ```text
//! /Users/Shared/caretaker/
//! ├── config/     # argv.json, caretaker.toml, defaults/ scripts
//! ├── logs/       # one log file per run
//! ├── projects/   # scaffolded projects
//! ├── cache/
//! └── backups/    # copies of settings documents that failed to parse
//! ```
//!
//! # Exit codes
//!
//! `0` success (warnings allowed), `1` an install/uninstall chain aborted or a
//! required check failed, `2` residues found with `--strict-residue`.

pub mod cmd;
pub mod menu;
pub mod session;
pub mod ui;

use caretaker_schema::Toolchain;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Version string including git metadata
pub const VERSION: &str = env!("CARETAKER_VERSION");

#[derive(Debug, Parser)]
#[command(name = "caretaker")]
#[command(author, version = VERSION, about = "caretaker - install, tune, and remove a macOS desktop app")]
pub struct Cli {
    /// Answer "yes" to every confirmation
    #[arg(long, short = 'y', global = true, env = "CARETAKER_ASSUME_YES")]
    pub yes: bool,

    /// Without a command the interactive menu is shown
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean install from the disk image
    Install {
        /// Disk image to install from (default: ~/Downloads/<App>.dmg)
        #[arg(long, env = "CARETAKER_DMG")]
        dmg: Option<PathBuf>,
        /// Do not scaffold the default project afterwards
        #[arg(long)]
        no_project: bool,
    },
    /// Remove the application and all of its data
    Uninstall {
        /// Also sweep the whole filesystem for residues (slow)
        #[arg(long)]
        deep: bool,
        /// Exit with status 2 if residues are found
        #[arg(long)]
        strict_residue: bool,
        /// Also delete the shared configuration and projects
        #[arg(long)]
        purge_shared: bool,
    },
    /// Apply hardware-specific performance settings
    Optimize {
        /// Remove every optimization instead
        #[arg(long, conflicts_with = "status")]
        reset: bool,
        /// Only show what is currently enabled
        #[arg(long)]
        status: bool,
    },
    /// Set up a project environment
    Project {
        /// Project name (letters, digits, '-', '_')
        name: Option<String>,
        /// venv, conda, poetry or node
        #[arg(long, short)]
        toolchain: Option<Toolchain>,
    },
    /// Run self-tests
    SelfTest,
    /// Repair the shared configuration
    Repair,
    /// Create a desktop shortcut to the application
    Shortcut,
    /// Show installation and optimization status
    Status,
    /// Show the interactive menu
    Menu,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// How a command finished, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Done, possibly with warnings.
    Success,
    /// An install/uninstall chain aborted, or the user declined.
    Aborted,
    /// Residues remained and `--strict-residue` was set.
    Residue,
}

impl Exit {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Aborted => 1,
            Self::Residue => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_project_toolchain() {
        let cli = Cli::try_parse_from(["caretaker", "project", "api", "--toolchain", "poetry"]).unwrap();
        match cli.command {
            Some(Commands::Project { name, toolchain }) => {
                assert_eq!(name.as_deref(), Some("api"));
                assert_eq!(toolchain, Some(Toolchain::Poetry));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["caretaker", "project", "x", "-t", "cargo"]).is_err());
    }

    #[test]
    fn test_reset_conflicts_with_status() {
        assert!(Cli::try_parse_from(["caretaker", "optimize", "--reset", "--status"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Exit::Success.code(), 0);
        assert_eq!(Exit::Aborted.code(), 1);
        assert_eq!(Exit::Residue.code(), 2);
    }
}
