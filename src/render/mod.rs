pub mod command;
pub mod metrics;

pub use command::{DisplayCommand, RecordingRenderer, Renderer};
pub use metrics::{ApproxWidthOracle, WidthOracle};
