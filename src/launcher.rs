//! Top-level controller tying the comment source, playback clock, scheduler,
//! and renderer together. Every method runs on the caller's thread; the
//! `playback::driver` module puts it on a timer.

use std::time::{Duration, Instant};
use tracing::{debug, info};
use crate::channel::MAX_LANES;
use crate::config::LauncherConfig;
use crate::events::{EventSink, LaneResetReason, LauncherError, LauncherEvent};
use crate::playback::{LauncherStats, PlaybackClock, Scheduler, TickOutcome};
use crate::render::{Renderer, WidthOracle};
use crate::source::{LaunchProfile, SourceConnection, SourceState};

pub struct DanmakuLauncher<R, W> {
    config: LauncherConfig,
    source: SourceConnection,
    clock: PlaybackClock,
    scheduler: Scheduler,
    renderer: R,
    oracle: W,
    events: EventSink,
    visible: bool,
    ticks: u64,
}

impl<R: Renderer, W: WidthOracle> DanmakuLauncher<R, W> {
    pub fn new(
        config: LauncherConfig,
        renderer: R,
        oracle: W,
        events: EventSink,
    ) -> Result<Self, LauncherError> {
        config.validate()?;

        let scheduler = Scheduler::new(&config);
        let profile = LaunchProfile {
            room_url: config.room_url.clone(),
            font_scale: scheduler.settings().font_scale(),
            font_alpha: scheduler.settings().font_alpha().to_string(),
        };
        let source = SourceConnection::new(
            config.source.clone(),
            config.socket_path.clone(),
            profile,
            Duration::from_millis(config.restart_gap_ms),
        );

        Ok(Self {
            clock: PlaybackClock::new(config.max_extrapolation_ms, config.seek_threshold_ms),
            config,
            source,
            scheduler,
            renderer,
            oracle,
            events,
            visible: true,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn source_state(&self) -> SourceState {
        self.source.state()
    }

    pub fn source(&self) -> &SourceConnection {
        &self.source
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn stats(&self) -> LauncherStats {
        LauncherStats {
            ticks: self.ticks,
            ..self.scheduler.stats()
        }
    }

    // Lifecycle

    /// Spawn the comment source. A spawn failure leaves the source
    /// `NotRunning` and is also reported as `SourceSpawnFailed`.
    pub fn start(&mut self) -> Result<(), LauncherError> {
        self.source.start(&self.events)?;
        Ok(())
    }

    /// Host player reports the stream is up
    pub fn on_stream_start(&mut self) -> Result<(), LauncherError> {
        self.source.on_stream_start(&self.events)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.source.stop(&self.events);
        self.scheduler.reinit_queue();
    }

    pub fn restart(&mut self) {
        self.source.restart(&self.events);
        self.scheduler.reinit_queue();
    }

    // Configuration, applied from the next tick

    pub fn set_scale(&mut self, width: u32, height: u32) {
        let settings = self.scheduler.settings_mut();
        settings.set_scale(width, height);
        let lanes = (settings.surface_height / settings.line_height_px().max(1)) as usize;

        if self.config.auto_lane_count {
            let now = self.clock.now_ms();
            self.scheduler
                .resize_lanes(lanes.clamp(1, MAX_LANES), now, &self.events);
        }
        debug!(width, height, "surface scale changed");
    }

    /// Negative arguments leave the corresponding setting unchanged
    pub fn set_font(&mut self, font_scale: f64, font_alpha: f64) {
        self.scheduler.settings_mut().set_font(font_scale, font_alpha);
        self.sync_font_profile();
    }

    pub fn set_font_scale_delta(&mut self, delta: f64) {
        self.scheduler.settings_mut().adjust_font_scale(delta);
        self.sync_font_profile();
    }

    /// Flip nickname display. Returns the new setting.
    pub fn set_toggle_nick(&mut self) -> bool {
        let show = self.scheduler.settings_mut().toggle_nick();
        debug!(show, "nickname display toggled");
        show
    }

    fn sync_font_profile(&mut self) {
        let settings = self.scheduler.settings();
        self.source
            .set_font_profile(settings.font_scale(), settings.font_alpha().to_string());
    }

    // Visibility

    /// Hiding clears the screen and suspends scheduling; showing again
    /// starts from an empty queue.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if visible {
            // the driver does not tick while hidden; whatever the source sent
            // meanwhile is still in the channel and belongs to the old queue
            self.pump_source();
            self.scheduler.reinit_queue();
        } else {
            self.renderer.clear_all();
            self.scheduler.allocator_mut().reset_all();
        }
        info!(visible, "danmaku visibility changed");
        self.events.emit(LauncherEvent::VisibilityChanged { visible });
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.set_visible(!self.visible);
        self.visible
    }

    // Playback clock

    pub fn on_position_changed(&mut self, position_ms: f64) {
        if self.clock.on_position_changed(position_ms) {
            let now = self.clock.now_ms();
            self.scheduler
                .reset_lanes(LaneResetReason::Seek, now, &self.events);
        }
    }

    pub fn on_duration_changed(&mut self, duration_ms: f64) {
        self.clock.on_duration_changed(duration_ms);
    }

    // Ticking

    pub fn tick(&mut self) -> Option<TickOutcome> {
        self.tick_at(Instant::now())
    }

    /// Poll the source, integrate what it sent, and make one display
    /// decision. Returns `None` when hidden or the source is not running.
    pub fn tick_at(&mut self, at: Instant) -> Option<TickOutcome> {
        self.ticks += 1;
        self.pump_source();

        if !self.visible || !self.source.state().is_running() {
            return None;
        }
        let now = self.clock.now_ms_at(at);
        Some(
            self.scheduler
                .tick(now, &self.oracle, &mut self.renderer, &self.events),
        )
    }

    /// Advance the source lifecycle and move received lines into the ring
    fn pump_source(&mut self) {
        self.source.poll(&self.events);
        for line in self.source.lines() {
            self.scheduler.ingest_line(&line, &self.events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::path::{Path, PathBuf};
    use crossbeam::channel::Receiver;
    use crate::config::SourceCommand;
    use crate::render::RecordingRenderer;

    type TestLauncher = DanmakuLauncher<RecordingRenderer, fn(&str, i32) -> i32>;

    fn ten_px(text: &str, _font_size: i32) -> i32 {
        text.chars().count() as i32 * 10
    }

    fn config(dir: &Path, program: &str, args: &[&str]) -> LauncherConfig {
        LauncherConfig {
            room_url: "https://live.example/1".to_string(),
            socket_path: dir.join("dm.sock"),
            source: SourceCommand {
                program: PathBuf::from(program),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
            restart_gap_ms: 0,
            repeat_window_ms: 0,
            rng_seed: Some(3),
            ..LauncherConfig::default()
        }
    }

    fn launcher(config: LauncherConfig) -> (TestLauncher, Receiver<LauncherEvent>) {
        let (events, rx) = EventSink::new();
        let oracle: fn(&str, i32) -> i32 = ten_px;
        let launcher = DanmakuLauncher::new(config, RecordingRenderer::new(), oracle, events).unwrap();
        (launcher, rx)
    }

    fn tick_until(launcher: &mut TestLauncher, done: impl Fn(&TestLauncher) -> bool) {
        for _ in 0..1000 {
            launcher.tick();
            if done(launcher) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("launcher stuck with source {}", launcher.source_state());
    }

    /// Start a `sleep` process as the source and connect to the endpoint
    /// the way a real source would
    fn running(dir: &Path) -> (TestLauncher, Receiver<LauncherEvent>, UnixStream) {
        let (mut launcher, rx) = launcher(config(dir, "sh", &["-c", "sleep 30"]));
        launcher.start().unwrap();
        launcher.on_stream_start().unwrap();
        let client = UnixStream::connect(dir.join("dm.sock")).unwrap();
        tick_until(&mut launcher, |l| l.source_state().is_running());
        (launcher, rx, client)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (events, _rx) = EventSink::new();
        let config = LauncherConfig {
            lane_count: 0,
            ..LauncherConfig::default()
        };
        let result = DanmakuLauncher::new(config, RecordingRenderer::new(), ten_px, events);
        assert!(matches!(result, Err(LauncherError::Config(_))));
    }

    #[test]
    fn test_spawn_failure_leaves_queue_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, rx) = launcher(config(dir.path(), "/nonexistent/danmaku-source", &[]));

        assert!(matches!(launcher.start(), Err(LauncherError::Source(_))));
        assert_eq!(launcher.source_state(), SourceState::NotRunning);
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, LauncherEvent::SourceSpawnFailed { .. })));
        assert_eq!(launcher.tick(), None);
        assert!(launcher.scheduler().queue().is_empty());
    }

    #[test]
    fn test_ticks_are_noops_until_running() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx) = launcher(config(dir.path(), "sh", &["-c", "sleep 30"]));
        assert_eq!(launcher.tick(), None);
        launcher.start().unwrap();
        assert_eq!(launcher.tick(), None);
        assert_eq!(launcher.stats().ticks, 2);
        assert!(launcher.renderer().displayed.is_empty());
    }

    #[test]
    fn test_comments_flow_to_renderer() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, rx, mut client) = running(dir.path());

        client
            .write_all(b"0\t0\tfirst\nnot a comment\n0\t1\tbob: second\n")
            .unwrap();
        tick_until(&mut launcher, |l| l.renderer().displayed.len() == 2);

        let texts: Vec<_> = launcher
            .renderer()
            .displayed
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(launcher.stats().malformed, 1);
        assert!(rx
            .try_iter()
            .any(|e| matches!(e, LauncherEvent::IgnoredMalformedLine { .. })));
    }

    #[test]
    fn test_hide_clears_once_and_show_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, rx, mut client) = running(dir.path());

        client.write_all(b"0\t0\tone\n0\t0\ttwo\n0\t0\tthree\n").unwrap();
        tick_until(&mut launcher, |l| l.renderer().displayed.len() == 3);

        launcher.set_visible(false);
        launcher.set_visible(false);
        assert_eq!(launcher.renderer().clear_count, 1);
        assert_eq!(launcher.tick(), None);

        client.write_all(b"0\t0\twhile hidden\n").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        launcher.tick();

        assert!(launcher.toggle_visible());
        assert!(launcher.scheduler().queue().is_empty());
        assert_eq!(launcher.scheduler().allocator().free_lanes(0), 14);
        assert_eq!(launcher.renderer().clear_count, 1);
        assert_eq!(launcher.renderer().displayed.len(), 3);

        let visibility: Vec<_> = rx
            .try_iter()
            .filter_map(|e| match e {
                LauncherEvent::VisibilityChanged { visible } => Some(visible),
                _ => None,
            })
            .collect();
        assert_eq!(visibility, vec![false, true]);
    }

    #[test]
    fn test_comments_sent_while_hidden_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx, mut client) = running(dir.path());

        launcher.set_visible(false);
        client.write_all(b"0\t0\tsent while hidden\n").unwrap();
        std::thread::sleep(Duration::from_millis(100));

        // no ticks while hidden, as under the driver
        launcher.set_visible(true);
        for _ in 0..5 {
            launcher.tick();
        }
        assert!(launcher.renderer().displayed.is_empty());
        assert!(launcher.scheduler().queue().is_empty());
        assert_eq!(launcher.stats().ingested, 1);
    }

    #[test]
    fn test_restart_yields_empty_queue() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx, _client) = running(dir.path());

        // scheduled ahead of the clock, so it waits at the head
        launcher.scheduler.ingest_line("2000\t0\tpending", &launcher.events);
        assert!(!launcher.scheduler().queue().is_empty());

        launcher.restart();
        assert_eq!(launcher.source_state(), SourceState::NotRunning);
        assert!(launcher.scheduler().queue().is_empty());

        tick_until(&mut launcher, |l| l.source_state() == SourceState::WaitingForStream);
        launcher.on_stream_start().unwrap();
        let _client = UnixStream::connect(dir.path().join("dm.sock")).unwrap();
        tick_until(&mut launcher, |l| l.source_state().is_running());
        assert!(launcher.scheduler().queue().is_empty());
    }

    #[test]
    fn test_stop_from_any_state() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, rx) = launcher(config(dir.path(), "sh", &["-c", "sleep 30"]));
        launcher.stop();
        assert_eq!(launcher.source_state(), SourceState::NotRunning);

        launcher.start().unwrap();
        launcher.stop();
        assert_eq!(launcher.source_state(), SourceState::NotRunning);

        launcher.start().unwrap();
        launcher.on_stream_start().unwrap();
        launcher.stop();
        assert_eq!(launcher.source_state(), SourceState::NotRunning);
        assert!(!dir.path().join("dm.sock").exists());
        assert!(rx.try_iter().any(|e| e == LauncherEvent::SourceStopped));
    }

    #[test]
    fn test_backward_seek_resets_lanes() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, rx) = launcher(config(dir.path(), "true", &[]));
        launcher.on_position_changed(60_000.0);
        launcher.scheduler.allocator_mut().occupy(0, 60_000, 5_000, 100);

        launcher.on_position_changed(10_000.0);
        assert_eq!(launcher.scheduler().allocator().free_lanes(10_000), 14);
        assert_eq!(launcher.stats().seek_resets, 1);
        assert!(rx.try_iter().any(|e| matches!(
            e,
            LauncherEvent::LanesReset { reason: LaneResetReason::Seek, .. }
        )));
    }

    #[test]
    fn test_auto_lane_count_follows_height() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx) = launcher(LauncherConfig {
            auto_lane_count: true,
            ..config(dir.path(), "true", &[])
        });
        // 40 px font, 50 px lines
        launcher.set_scale(1920, 1080);
        assert_eq!(launcher.scheduler().allocator().lane_count(), 21);
        // 27 px font, 33 px lines
        launcher.set_scale(1280, 720);
        assert_eq!(launcher.scheduler().allocator().lane_count(), 21);
        launcher.set_font(3.0, -1.0);
        launcher.set_scale(1280, 720);
        assert_eq!(launcher.scheduler().allocator().lane_count(), 7);
    }

    #[test]
    fn test_fixed_lane_count_ignores_scale() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx) = launcher(config(dir.path(), "true", &[]));
        launcher.set_scale(640, 360);
        assert_eq!(launcher.scheduler().allocator().lane_count(), 14);
        assert_eq!(launcher.scheduler().settings().font_size_px(), 13);
    }

    #[test]
    fn test_font_changes_reach_source_profile_and_display() {
        let dir = tempfile::tempdir().unwrap();
        let (mut launcher, _rx) = launcher(config(dir.path(), "true", &[]));
        launcher.set_font(1.5, 0.5);
        launcher.set_font_scale_delta(0.5);
        let settings = launcher.scheduler().settings();
        assert!((settings.font_scale() - 2.0).abs() < 1e-9);
        assert_eq!(settings.font_alpha(), "80");
        assert_eq!(settings.font_size_px(), 80);

        assert!(launcher.set_toggle_nick());
        assert!(!launcher.set_toggle_nick());
    }
}
