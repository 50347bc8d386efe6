//! External comment-source process.

use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};
use crate::config::SourceCommand;
use crate::events::SourceError;

/// Arguments resolved from configuration at start time
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchArgs<'a> {
    pub room_url: &'a str,
    pub socket_path: &'a Path,
    pub font_scale: f64,
    /// Two hex digits
    pub font_alpha: &'a str,
}

impl LaunchArgs<'_> {
    /// Generated arguments, appended after the configured ones
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--room".to_string(),
            self.room_url.to_string(),
            "--socket".to_string(),
            self.socket_path.display().to_string(),
            "--font-scale".to_string(),
            format!("{}", self.font_scale),
            "--font-alpha".to_string(),
            self.font_alpha.to_string(),
        ]
    }
}

/// A running source process. Killed and reaped on drop.
#[derive(Debug)]
pub struct SourceProcess {
    child: Child,
}

impl SourceProcess {
    pub fn spawn(command: &SourceCommand, launch: &LaunchArgs<'_>) -> Result<Self, SourceError> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .args(launch.to_args())
            .stdin(Stdio::null())
            // the host may use stdout for display commands
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        info!(pid = child.id(), program = ?command.program, "comment source spawned");
        Ok(Self { child })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking exit check. `Some(code)` once the process is gone
    /// (`code` is `None` when it was killed by a signal).
    pub fn try_exit(&mut self) -> Option<Option<i32>> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code()),
            Ok(None) => None,
            Err(err) => {
                warn!(?err, "could not poll comment source");
                None
            }
        }
    }

    /// Kill the process and wait for it
    pub fn kill(mut self) {
        self.terminate();
    }

    fn terminate(&mut self) {
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        if let Err(err) = self.child.kill() {
            debug!(?err, "kill failed, process probably exited");
        }
        match self.child.wait() {
            Ok(status) => debug!(pid = self.child.id(), ?status, "comment source reaped"),
            Err(err) => warn!(?err, "could not reap comment source"),
        }
    }
}

impl Drop for SourceProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}
