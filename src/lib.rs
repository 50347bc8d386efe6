//! Danmaku overlay-comment scheduling engine.
//!
//! Comments arrive from an external source process over a local socket, wait
//! in a bounded ring, and are assigned to horizontal lanes so scrolling text
//! does not collide. Rendering and font metrics belong to the host and are
//! reached through the `Renderer` and `WidthOracle` traits.

pub mod channel;
pub mod config;
pub mod core;
pub mod events;
pub mod launcher;
pub mod logging;
pub mod playback;
pub mod queue;
pub mod render;
pub mod source;

pub use config::LauncherConfig;
pub use events::{EventSink, LauncherError, LauncherEvent};
pub use launcher::DanmakuLauncher;
