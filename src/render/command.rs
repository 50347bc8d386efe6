//! Commands emitted to the external renderer.
//! The engine never draws; it only says what to show, where, and for how long.

use crate::core::time::Millis;

/// Show `text` scrolling through lane `lane_index`.
///
/// Horizontal positions are in surface pixels. The comment enters at the
/// right edge (`start_x`) and leaves once its tail passes the left edge
/// (`end_x == -width`).
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayCommand {
    pub text: String,
    pub lane_index: u16,
    /// Lanes in the pool when the command was issued (for vertical layout)
    pub lane_count: u16,
    pub start_x: i32,
    pub end_x: i32,
    pub duration_ms: Millis,
    pub font_size_px: i32,
    /// Two hex digits, "00" is opaque
    pub font_alpha: String,
}

impl DisplayCommand {
    /// Scroll velocity in pixels per millisecond
    pub fn velocity(&self) -> f64 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        f64::from(self.start_x - self.end_x) / self.duration_ms as f64
    }
}

/// Sink for render commands, implemented by the host's overlay
pub trait Renderer {
    fn display(&mut self, command: DisplayCommand);

    /// Hide every comment currently on screen
    fn clear_all(&mut self);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn display(&mut self, command: DisplayCommand) {
        (**self).display(command)
    }

    fn clear_all(&mut self) {
        (**self).clear_all()
    }
}

/// Renderer that keeps everything it is told, for tests and headless hosts
#[derive(Debug, Default, Clone)]
pub struct RecordingRenderer {
    pub displayed: Vec<DisplayCommand>,
    pub clear_count: usize,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for RecordingRenderer {
    fn display(&mut self, command: DisplayCommand) {
        self.displayed.push(command);
    }

    fn clear_all(&mut self) {
        self.clear_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity() {
        let command = DisplayCommand {
            text: "hi".to_string(),
            lane_index: 0,
            lane_count: 14,
            start_x: 1920,
            end_x: -240,
            duration_ms: 9000,
            font_size_px: 40,
            font_alpha: "00".to_string(),
        };
        assert!((command.velocity() - 0.24).abs() < 1e-9);
    }

    #[test]
    fn test_boxed_renderer_forwards() {
        let mut boxed: Box<RecordingRenderer> = Box::default();
        boxed.clear_all();
        Renderer::clear_all(&mut boxed);
        assert_eq!(boxed.clear_count, 2);
    }
}
