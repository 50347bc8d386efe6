//! Headless launcher: display commands go to stdout, control commands come
//! from stdin one per line.
//!
//! Usage: `danmaku-launcher <room_url> [source_program]`

use std::io::{self, BufRead, Write};
use std::thread;
use danmaku_launcher::events::{EventSink, LauncherError, LauncherEvent};
use danmaku_launcher::playback::driver::{self, DriverHandle};
use danmaku_launcher::render::{ApproxWidthOracle, DisplayCommand, Renderer};
use danmaku_launcher::{logging, DanmakuLauncher, LauncherConfig};

const USAGE: &str = "usage: danmaku-launcher <room_url> [source_program]";
const FONT_STEP: f64 = 0.1;

/// Writes one line per command
struct StdoutRenderer;

impl Renderer for StdoutRenderer {
    fn display(&mut self, command: DisplayCommand) {
        let mut out = io::stdout().lock();
        let _ = writeln!(
            out,
            "display lane={}/{} size={} alpha={} x={}..{} ms={} {}",
            command.lane_index,
            command.lane_count,
            command.font_size_px,
            command.font_alpha,
            command.start_x,
            command.end_x,
            command.duration_ms,
            command.text,
        );
    }

    fn clear_all(&mut self) {
        let _ = writeln!(io::stdout().lock(), "clear");
    }
}

fn main() -> Result<(), LauncherError> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let Some(room_url) = args.next() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let mut config = LauncherConfig::for_room(room_url);
    if let Some(program) = args.next() {
        config.source.program = program.into();
    }

    let (events, event_rx) = EventSink::new();
    let launcher = DanmakuLauncher::new(config, StdoutRenderer, ApproxWidthOracle, events)?;

    thread::Builder::new()
        .name("danmaku-events".to_string())
        .spawn(move || {
            for event in event_rx {
                log_event(&event);
            }
        })
        .map_err(LauncherError::Runtime)?;

    let (handle, commands) = driver::channel();
    thread::Builder::new()
        .name("danmaku-stdin".to_string())
        .spawn(move || read_commands(handle))
        .map_err(LauncherError::Runtime)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(LauncherError::Runtime)?;
    runtime.block_on(driver::run(launcher, commands));
    Ok(())
}

fn read_commands(handle: DriverHandle) {
    handle.start();
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let mut words = line.split_whitespace();
        let sent = match (words.next(), words.next()) {
            (Some("stream"), _) => handle.stream_started(),
            (Some("start"), _) => handle.start(),
            (Some("stop"), _) => handle.stop(),
            (Some("restart"), _) => handle.restart(),
            (Some("nick"), _) => handle.toggle_nick(),
            (Some("hide"), _) => handle.set_visible(false),
            (Some("show"), _) => handle.set_visible(true),
            (Some("font+"), _) => handle.set_font_scale_delta(FONT_STEP),
            (Some("font-"), _) => handle.set_font_scale_delta(-FONT_STEP),
            (Some("pos"), Some(ms)) => match ms.parse::<f64>() {
                Ok(ms) => handle.position_changed(ms),
                Err(_) => {
                    eprintln!("pos expects milliseconds, got {:?}", ms);
                    true
                }
            },
            (Some("quit"), _) => {
                handle.shutdown();
                return;
            }
            (None, _) => true,
            (Some(other), _) => {
                eprintln!("unknown command {:?}", other);
                true
            }
        };
        if !sent {
            return;
        }
    }
    // stdin closed
    handle.shutdown();
}

fn log_event(event: &LauncherEvent) {
    match event {
        LauncherEvent::SourceSpawnFailed { program, message } => {
            tracing::error!(program = %program.display(), %message, "comment source did not start")
        }
        LauncherEvent::NoChannelAvailable { .. }
        | LauncherEvent::QueueOverwrite { .. }
        | LauncherEvent::RepeatFiltered { .. }
        | LauncherEvent::IgnoredMalformedLine { .. } => tracing::debug!(?event),
        _ => tracing::info!(?event),
    }
}
