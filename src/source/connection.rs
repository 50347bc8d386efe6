//! Comment-source connection: one state machine owning the process and the
//! IPC endpoint. Every transition happens through a method on this type and
//! is driven from the tick loop via `poll`.

use std::collections::vec_deque::Drain;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use crate::config::SourceCommand;
use crate::core::comment::MalformedLine;
use crate::events::{EventSink, LauncherEvent, SourceError};
use crate::source::ipc::{IpcEndpoint, IpcMessage, MAX_LINE_BYTES};
use crate::source::process::{LaunchArgs, SourceProcess};
use crate::source::state::SourceState;

/// Values handed to the source process when it is (re)started
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchProfile {
    pub room_url: String,
    pub font_scale: f64,
    pub font_alpha: String,
}

pub struct SourceConnection {
    state: SourceState,
    command: SourceCommand,
    socket_path: PathBuf,
    profile: LaunchProfile,
    restart_gap: Duration,
    endpoint: Option<IpcEndpoint>,
    process: Option<SourceProcess>,
    inbound: VecDeque<String>,
    pending_start: Option<Instant>,
}

impl SourceConnection {
    pub fn new(
        command: SourceCommand,
        socket_path: PathBuf,
        profile: LaunchProfile,
        restart_gap: Duration,
    ) -> Self {
        Self {
            state: SourceState::NotRunning,
            command,
            socket_path,
            profile,
            restart_gap,
            endpoint: None,
            process: None,
            inbound: VecDeque::new(),
            pending_start: None,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process.as_ref().map(SourceProcess::id)
    }

    /// A restart is waiting out its quiescent gap
    pub fn restart_pending(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Font settings used the next time the process starts
    pub fn set_font_profile(&mut self, font_scale: f64, font_alpha: String) {
        self.profile.font_scale = font_scale;
        self.profile.font_alpha = font_alpha;
    }

    /// `NotRunning` -> `WaitingForStream`: spawn the source process.
    /// Ignored in any other state.
    pub fn start(&mut self, events: &EventSink) -> Result<(), SourceError> {
        if !self.state.is_stopped() {
            debug!(state = %self.state, "start ignored");
            return Ok(());
        }
        self.pending_start = None;

        let launch = LaunchArgs {
            room_url: &self.profile.room_url,
            socket_path: &self.socket_path,
            font_scale: self.profile.font_scale,
            font_alpha: &self.profile.font_alpha,
        };
        match SourceProcess::spawn(&self.command, &launch) {
            Ok(process) => {
                events.emit(LauncherEvent::SourceStarted { pid: process.id() });
                self.process = Some(process);
                self.transition(SourceState::WaitingForStream);
                Ok(())
            }
            Err(err) => {
                warn!(%err, "comment source failed to spawn");
                events.emit(LauncherEvent::SourceSpawnFailed {
                    program: self.command.program.clone(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// `WaitingForStream` -> `WaitingForSocket`: the host player reports the
    /// stream started, so bind the endpoint the source connects to.
    pub fn on_stream_start(&mut self, events: &EventSink) -> Result<(), SourceError> {
        if self.state != SourceState::WaitingForStream {
            debug!(state = %self.state, "stream start ignored");
            return Ok(());
        }
        match IpcEndpoint::bind(&self.socket_path) {
            Ok(endpoint) => {
                self.endpoint = Some(endpoint);
                self.transition(SourceState::WaitingForSocket);
                events.emit(LauncherEvent::StreamListening {
                    path: self.socket_path.clone(),
                });
                Ok(())
            }
            Err(err) => {
                warn!(%err, "could not open comment endpoint");
                self.teardown();
                events.emit(LauncherEvent::SourceStopped);
                Err(err)
            }
        }
    }

    /// Tear down from any state. Always ends in `NotRunning` with the
    /// process reaped and the endpoint unlinked. Cancels a pending restart.
    pub fn stop(&mut self, events: &EventSink) {
        self.pending_start = None;
        self.inbound.clear();
        let was_running = !self.state.is_stopped() || self.process.is_some();
        self.teardown();
        if was_running {
            events.emit(LauncherEvent::SourceStopped);
        }
    }

    /// Stop now, start again once the restart gap has passed (from `poll`)
    pub fn restart(&mut self, events: &EventSink) {
        self.stop(events);
        self.pending_start = Some(Instant::now() + self.restart_gap);
        info!(gap_ms = self.restart_gap.as_millis() as u64, "comment source restart scheduled");
    }

    /// Drive the state machine: deferred starts, accepting the connection,
    /// buffering inbound lines, and noticing end-of-stream or process exit.
    pub fn poll(&mut self, events: &EventSink) {
        if let Some(at) = self.pending_start {
            if Instant::now() >= at {
                self.pending_start = None;
                // failure was already reported through events
                let _ = self.start(events);
            }
        }

        if self.state == SourceState::WaitingForSocket {
            let accepted = match self.endpoint.as_mut() {
                Some(endpoint) => endpoint.poll_accept(),
                None => Ok(false),
            };
            match accepted {
                Ok(true) => {
                    self.transition(SourceState::Running);
                    events.emit(LauncherEvent::SourceConnected);
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(%err, "accepting comment source failed");
                    self.teardown();
                    events.emit(LauncherEvent::SourceDisconnected);
                    return;
                }
            }
        }

        if self.state.is_running() {
            let mut closed = None;
            if let Some(endpoint) = &self.endpoint {
                for message in endpoint.try_iter() {
                    match message {
                        IpcMessage::Line(line) => self.inbound.push_back(line),
                        IpcMessage::Overlong { preview, len } => {
                            warn!(len, "comment source sent an overlong line");
                            events.emit(LauncherEvent::IgnoredMalformedLine {
                                line: preview,
                                reason: MalformedLine::TooLong {
                                    len,
                                    limit: MAX_LINE_BYTES,
                                },
                            });
                        }
                        IpcMessage::Closed(reason) => {
                            closed = Some(reason);
                            break;
                        }
                    }
                }
            }
            if let Some(reason) = closed {
                info!(?reason, "comment source disconnected");
                self.teardown();
                events.emit(LauncherEvent::SourceDisconnected);
                return;
            }
        }

        if let Some(code) = self.process.as_mut().and_then(SourceProcess::try_exit) {
            info!(?code, "comment source exited");
            self.teardown();
            events.emit(LauncherEvent::SourceExited { code });
        }
    }

    /// Lines received since the last drain, oldest first
    pub fn lines(&mut self) -> Drain<'_, String> {
        self.inbound.drain(..)
    }

    fn teardown(&mut self) {
        if let Some(mut endpoint) = self.endpoint.take() {
            endpoint.close();
        }
        if let Some(process) = self.process.take() {
            process.kill();
        }
        self.transition(SourceState::NotRunning);
    }

    fn transition(&mut self, next: SourceState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "comment source state");
            self.state = next;
        }
    }
}
