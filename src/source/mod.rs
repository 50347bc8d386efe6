//! External comment source: process lifecycle and the IPC channel.

pub mod connection;
pub mod ipc;
pub mod process;
pub mod state;

pub use connection::{LaunchProfile, SourceConnection};
pub use ipc::{IpcEndpoint, IpcMessage};
pub use process::{LaunchArgs, SourceProcess};
pub use state::SourceState;
