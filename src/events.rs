//! Observable conditions and error types.
//!
//! Nothing in the engine is allowed to take the host down. Fallible control
//! calls return a `Result`, and everything else is reported as a
//! `LauncherEvent` over a crossbeam channel the host may drain at leisure.

use std::path::PathBuf;
use crossbeam::channel;
use crate::config::ConfigError;
use crate::core::comment::MalformedLine;
use crate::core::time::Millis;

/// Error type for source lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to bind {path:?}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("source io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for the launcher as a whole
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Runtime error: {0}")]
    Runtime(std::io::Error),
}

/// Why every lane was forced free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneResetReason {
    /// Too many consecutive scans found no free lane
    Exhaustion,
    /// The playback clock jumped backwards
    Seek,
    /// The lane pool was regenerated with a new size
    Resize,
}

/// Events emitted by the launcher
#[derive(Debug, Clone, PartialEq)]
pub enum LauncherEvent {
    SourceSpawnFailed { program: PathBuf, message: String },
    SourceStarted { pid: u32 },
    StreamListening { path: PathBuf },
    SourceConnected,
    /// The IPC channel reached end-of-stream
    SourceDisconnected,
    SourceExited { code: Option<i32> },
    SourceStopped,
    IgnoredMalformedLine { line: String, reason: MalformedLine },
    NoChannelAvailable { arrival_order: u64, width_px: i32 },
    /// An unread record was overwritten by a newer arrival
    QueueOverwrite { arrival_order: u64 },
    RepeatFiltered { arrival_order: u64 },
    LanesReset { reason: LaneResetReason, at: Millis },
    VisibilityChanged { visible: bool },
}

/// Sending half of the event channel. Sends never fail the caller.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: channel::Sender<LauncherEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the host drains
    pub fn new() -> (Self, channel::Receiver<LauncherEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: LauncherEvent) {
        // a host that dropped its receiver just stops hearing about it
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (sink, rx) = EventSink::new();
        sink.emit(LauncherEvent::SourceConnected);
        assert_eq!(rx.try_recv().unwrap(), LauncherEvent::SourceConnected);
        drop(rx);
        sink.emit(LauncherEvent::SourceStopped);
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Spawn {
            program: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nope"));

        let wrapped: LauncherError = err.into();
        assert!(wrapped.to_string().starts_with("Source error"));
    }
}
