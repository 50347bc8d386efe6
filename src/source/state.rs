//! Comment-source lifecycle state machine.

use std::fmt;

/// Lifecycle state of the external comment source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    /// No process, no endpoint
    #[default]
    NotRunning,
    /// Process spawned, waiting for the host player to report the stream started
    WaitingForStream,
    /// Endpoint bound, waiting for the process to connect
    WaitingForSocket,
    /// Connected, lines are flowing
    Running,
}

impl SourceState {
    /// Check if comments are flowing
    pub fn is_running(&self) -> bool {
        matches!(self, SourceState::Running)
    }

    /// Check if fully torn down
    pub fn is_stopped(&self) -> bool {
        matches!(self, SourceState::NotRunning)
    }

    /// Check if the process is up but not yet connected
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            SourceState::WaitingForStream | SourceState::WaitingForSocket
        )
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceState::NotRunning => "not-running",
            SourceState::WaitingForStream => "waiting-for-stream",
            SourceState::WaitingForSocket => "waiting-for-socket",
            SourceState::Running => "running",
        };
        f.write_str(name)
    }
}
