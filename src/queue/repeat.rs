//! Repeat-spam filter.
//!
//! Live rooms often flood the same phrase. A comment whose normalized text
//! was accepted within the last `window` milliseconds is rejected before it
//! takes a ring slot.

use std::collections::VecDeque;
use crate::core::time::Millis;

#[derive(Debug, Clone)]
pub struct RepeatFilter {
    window: Millis,
    history: usize,
    seen: VecDeque<(String, Millis)>,
}

impl RepeatFilter {
    /// A zero window or zero history disables the filter
    pub fn new(window: Millis, history: usize) -> Self {
        Self {
            window: window.max(0),
            history,
            seen: VecDeque::with_capacity(history.min(256)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.window > 0 && self.history > 0
    }

    /// Returns `true` if the message should be kept, and remembers it
    pub fn accept(&mut self, message: &str, pts: Millis) -> bool {
        if !self.is_enabled() {
            return true;
        }
        let key = normalize(message);
        if key.is_empty() {
            return true;
        }

        let window = self.window.unsigned_abs();
        // timestamps are not guaranteed sorted, compare by distance
        let repeated = self
            .seen
            .iter()
            .any(|(text, at)| *text == key && pts.abs_diff(*at) < window);
        if repeated {
            return false;
        }

        self.seen.retain(|(_, at)| pts.abs_diff(*at) < window);
        while self.seen.len() >= self.history {
            self.seen.pop_front();
        }
        self.seen.push_back((key, pts));
        true
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

fn normalize(message: &str) -> String {
    message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
