//! Timer loop driving a `DanmakuLauncher`.
//! Runs on a current-thread tokio runtime; control calls arrive as
//! `ControlCommand`s so the launcher is only ever touched by this task.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use crate::launcher::DanmakuLauncher;
use crate::playback::scheduler::LauncherStats;
use crate::render::{Renderer, WidthOracle};

/// Control surface as messages
#[derive(Debug)]
pub enum ControlCommand {
    Start,
    Stop,
    Restart,
    StreamStarted,
    SetScale { width: u32, height: u32 },
    SetFont { font_scale: f64, font_alpha: f64 },
    SetFontScaleDelta(f64),
    ToggleNick,
    SetVisible(bool),
    ToggleVisible,
    PositionChanged(f64),
    DurationChanged(f64),
    Stats(oneshot::Sender<LauncherStats>),
    Shutdown,
}

/// Cloneable sender for a running driver. Sends after the driver has
/// stopped are ignored.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::UnboundedSender<ControlCommand>,
}

impl DriverHandle {
    /// Returns `false` once the driver is gone
    pub fn send(&self, command: ControlCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(ControlCommand::Start)
    }

    pub fn stop(&self) -> bool {
        self.send(ControlCommand::Stop)
    }

    pub fn restart(&self) -> bool {
        self.send(ControlCommand::Restart)
    }

    pub fn stream_started(&self) -> bool {
        self.send(ControlCommand::StreamStarted)
    }

    pub fn set_scale(&self, width: u32, height: u32) -> bool {
        self.send(ControlCommand::SetScale { width, height })
    }

    pub fn set_font(&self, font_scale: f64, font_alpha: f64) -> bool {
        self.send(ControlCommand::SetFont { font_scale, font_alpha })
    }

    pub fn set_font_scale_delta(&self, delta: f64) -> bool {
        self.send(ControlCommand::SetFontScaleDelta(delta))
    }

    pub fn toggle_nick(&self) -> bool {
        self.send(ControlCommand::ToggleNick)
    }

    pub fn set_visible(&self, visible: bool) -> bool {
        self.send(ControlCommand::SetVisible(visible))
    }

    pub fn toggle_visible(&self) -> bool {
        self.send(ControlCommand::ToggleVisible)
    }

    pub fn position_changed(&self, position_ms: f64) -> bool {
        self.send(ControlCommand::PositionChanged(position_ms))
    }

    pub fn duration_changed(&self, duration_ms: f64) -> bool {
        self.send(ControlCommand::DurationChanged(duration_ms))
    }

    pub async fn stats(&self) -> Option<LauncherStats> {
        let (tx, rx) = oneshot::channel();
        if !self.send(ControlCommand::Stats(tx)) {
            return None;
        }
        rx.await.ok()
    }

    pub fn shutdown(&self) -> bool {
        self.send(ControlCommand::Shutdown)
    }
}

/// Create a handle and the receiver `run` consumes
pub fn channel() -> (DriverHandle, mpsc::UnboundedReceiver<ControlCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DriverHandle { tx }, rx)
}

/// Tick the launcher until `Shutdown` arrives or every handle is dropped.
/// The source is stopped on the way out and the launcher handed back.
pub async fn run<R, W>(
    mut launcher: DanmakuLauncher<R, W>,
    mut commands: mpsc::UnboundedReceiver<ControlCommand>,
) -> DanmakuLauncher<R, W>
where
    R: Renderer,
    W: WidthOracle,
{
    let mut interval = time::interval(launcher.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_ms = launcher.config().tick_interval_ms, "danmaku driver running");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!("all driver handles dropped");
                    break;
                };
                if matches!(command, ControlCommand::Shutdown) {
                    break;
                }
                let was_visible = launcher.is_visible();
                apply(&mut launcher, command);
                if !was_visible && launcher.is_visible() {
                    // resume within one interval, without a burst of stale ticks
                    interval.reset();
                }
            }
            _ = interval.tick(), if launcher.is_visible() => {
                launcher.tick();
            }
        }
    }

    launcher.stop();
    info!("danmaku driver stopped");
    launcher
}

fn apply<R: Renderer, W: WidthOracle>(launcher: &mut DanmakuLauncher<R, W>, command: ControlCommand) {
    match command {
        ControlCommand::Start => {
            if let Err(err) = launcher.start() {
                warn!(%err, "start failed");
            }
        }
        ControlCommand::Stop => launcher.stop(),
        ControlCommand::Restart => launcher.restart(),
        ControlCommand::StreamStarted => {
            if let Err(err) = launcher.on_stream_start() {
                warn!(%err, "stream start failed");
            }
        }
        ControlCommand::SetScale { width, height } => launcher.set_scale(width, height),
        ControlCommand::SetFont { font_scale, font_alpha } => launcher.set_font(font_scale, font_alpha),
        ControlCommand::SetFontScaleDelta(delta) => launcher.set_font_scale_delta(delta),
        ControlCommand::ToggleNick => {
            launcher.set_toggle_nick();
        }
        ControlCommand::SetVisible(visible) => launcher.set_visible(visible),
        ControlCommand::ToggleVisible => {
            launcher.toggle_visible();
        }
        ControlCommand::PositionChanged(position) => launcher.on_position_changed(position),
        ControlCommand::DurationChanged(duration) => launcher.on_duration_changed(duration),
        ControlCommand::Stats(reply) => {
            let _ = reply.send(launcher.stats());
        }
        ControlCommand::Shutdown => {}
    }
}
