//! Playback-side scheduling: the video clock, display settings, the per-tick
//! scheduler, and the timer loop that drives it.

pub mod clock;
pub mod driver;
pub mod scheduler;
pub mod settings;

pub use clock::PlaybackClock;
pub use driver::{ControlCommand, DriverHandle};
pub use scheduler::{LauncherStats, Scheduler, TickOutcome};
pub use settings::{alpha_hex, DisplaySettings};
