//! Privilege heartbeat.
//!
//! Long privileged operations (uninstall, shared-state repair) would outlive
//! the `sudo` timestamp. The heartbeat re-validates it on a fixed interval
//! from a background thread and is stopped when the guard is dropped, so
//! every exit path, including `?` and panics, ends it.
//!
//! Elevated commands always run as `sudo -n`, so a credential has to be
//! cached first. [`ensure_credential`] asks for the password once, on the
//! terminal, when none is cached.

use crate::context::Context;
use crate::error::{CoreError, Result};
use crate::exec::{CommandRunner, Invocation};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Guard owning the heartbeat thread.
#[derive(Debug)]
pub struct PrivilegeHeartbeat {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PrivilegeHeartbeat {
    /// Spawn the heartbeat. The first refresh happens immediately.
    pub fn start(runner: Arc<dyn CommandRunner>, interval: Duration) -> Self {
        let (stop, rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            let refresh = Invocation::new("sudo").args(["-n", "-v"]);
            loop {
                match runner.run(&refresh) {
                    Ok(out) if !out.success() => {
                        tracing::debug!(status = ?out.status, "sudo refresh rejected");
                    }
                    Err(e) => tracing::debug!(error = %e, "sudo refresh failed"),
                    Ok(_) => {}
                }
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("privilege heartbeat stopped");
        });

        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// A guard that does nothing.
    pub fn disabled() -> Self {
        Self {
            stop: None,
            handle: None,
        }
    }

    /// Start if the context wants one: not mocked, not already root, enabled in config.
    pub fn for_context(ctx: &Context) -> Self {
        if ctx.mock || ctx.identity.is_root() || !ctx.config.privilege.heartbeat {
            return Self::disabled();
        }
        Self::start(ctx.runner.clone(), ctx.config.privilege.interval())
    }

    /// Cache a `sudo` credential for `purpose`, then start the heartbeat.
    pub fn acquire(ctx: &Context, purpose: &str) -> Result<Self> {
        ensure_credential(ctx, purpose)?;
        Ok(Self::for_context(ctx))
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PrivilegeHeartbeat {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // Ignore errors if the thread already exited
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Make sure `sudo -n` will not be refused for lack of a password.
///
/// Does nothing when already root or when a credential is cached. Otherwise
/// runs an interactive `sudo -v` if a terminal is attached. Errors with a
/// hint when no credential could be obtained.
pub fn ensure_credential(ctx: &Context, purpose: &str) -> Result<()> {
    if ctx.identity.is_root() {
        return Ok(());
    }
    let cached = ctx
        .runner
        .run(&Invocation::new("sudo").args(["-n", "-v"]))
        .is_ok_and(|o| o.success());
    if cached {
        return Ok(());
    }

    let hint = "run `sudo -v` in a terminal, then retry";
    if !ctx.interactive {
        return Err(CoreError::context(
            "Administrator rights required",
            format!("{purpose}: no cached sudo credential; {hint}"),
        ));
    }

    ctx.reporter
        .info(&format!("Administrator password needed to {purpose}"));
    let out = ctx
        .runner
        .run(&Invocation::new("sudo").arg("-v"))
        .map_err(|e| CoreError::command("sudo", e))?;
    if out.success() {
        tracing::info!(purpose, "sudo credential cached");
        Ok(())
    } else {
        Err(CoreError::context(
            "Administrator rights required",
            format!("{purpose}: {}; {hint}", out.failure_summary()),
        ))
    }
}
