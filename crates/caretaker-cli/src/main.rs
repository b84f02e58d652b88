//! caretaker - lifecycle manager for a macOS desktop application

use anyhow::Result;
use clap::Parser;
use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use caretaker_cli::session::{Mode, Session};
use caretaker_cli::{Cli, Commands, Exit, cmd, menu};
use caretaker_core::uninstall::UninstallOptions;
use caretaker_core::{Locations, Reporter, shared_state};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        cmd::completions::completions(shell);
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(e) => {
            eprintln!("ERROR {e:#}");
            ExitCode::from(Exit::Aborted.code())
        }
    }
}

fn run(cli: Cli) -> Result<Exit> {
    let locations = Locations::from_env()?;
    init_logging(&locations);
    tracing::info!(
        version = caretaker_cli::VERSION,
        core = caretaker_core::CORE_VERSION,
        "caretaker starting"
    );

    let mode = Mode::from_env(cli.yes);
    let session = Session::open(mode, locations)?;
    tracing::debug!(?mode, "session ready");

    // Every command works against the shared tree, so bring it into shape
    // first. Failures here are advisory; `repair` reports them in full.
    match shared_state::ensure_shared_state(&session.ctx) {
        Ok(outcome) => {
            for w in &outcome.warnings {
                tracing::warn!(step = %w.step, "{}", w.message);
            }
        }
        Err(e) => session
            .output
            .warning(&format!("Shared state is not ready: {e}")),
    }

    let Some(command) = cli.command else {
        if mode.noninteractive {
            session
                .output
                .info("Non-interactive mode: no command given, nothing to do.");
            return Ok(Exit::Success);
        }
        return menu::run(&session);
    };

    match command {
        Commands::Install { dmg, no_project } => cmd::install::install(&session, dmg, !no_project),
        Commands::Uninstall {
            deep,
            strict_residue,
            purge_shared,
        } => cmd::uninstall::uninstall(
            &session,
            UninstallOptions { deep, purge_shared },
            strict_residue,
        ),
        Commands::Optimize { reset, status } => {
            if status {
                cmd::optimize::status(&session)
            } else if reset {
                cmd::optimize::reset(&session)
            } else {
                cmd::optimize::optimize(&session)
            }
        }
        Commands::Project { name, toolchain } => cmd::project::project(&session, name, toolchain),
        Commands::SelfTest => cmd::selftest::self_test(&session),
        Commands::Repair => cmd::repair::repair(&session),
        Commands::Shortcut => cmd::shortcut::shortcut(&session),
        Commands::Status => cmd::status::status(&session),
        Commands::Menu => {
            if mode.noninteractive {
                anyhow::bail!("The menu is not available in non-interactive mode");
            }
            menu::run(&session)
        }
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(Exit::Success)
        }
    }
}

/// stderr honours `RUST_LOG`; the per-run log file under `logs/` always
/// records INFO and above when the directory can be created.
fn init_logging(locations: &Locations) {
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());

    let file = std::fs::create_dir_all(locations.logs_dir())
        .and_then(|()| File::create(locations.run_log_path()))
        .ok()
        .map(|f| {
            fmt::layer()
                .with_writer(Mutex::new(f))
                .with_ansi(false)
                .with_filter(LevelFilter::INFO)
        });

    tracing_subscriber::registry().with(stderr).with(file).init();
}
