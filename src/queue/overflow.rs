//! Record of comments that never made it to the screen.

use std::collections::VecDeque;
use crate::core::comment::CommentRecord;

/// Why a comment was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// Every lane was busy
    NoChannel,
    /// Overwritten in the ring before it was read
    Overwritten,
    /// Same text was shown moments ago
    Repeated,
}

/// A dropped comment and the reason it was dropped
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedComment {
    pub record: CommentRecord,
    pub reason: DropReason,
}

/// Ordered list of dropped comments, optionally capped (oldest evicted first)
#[derive(Debug, Clone)]
pub struct OverflowList {
    entries: VecDeque<DroppedComment>,
    cap: Option<usize>,
    total: u64,
}

impl OverflowList {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            cap,
            total: 0,
        }
    }

    pub fn push(&mut self, record: CommentRecord, reason: DropReason) {
        self.total += 1;
        if self.cap == Some(0) {
            return;
        }
        if let Some(cap) = self.cap {
            while self.entries.len() >= cap {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(DroppedComment { record, reason });
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every drop ever recorded, including evicted entries
    pub fn total_dropped(&self) -> u64 {
        self.total
    }

    /// Retained entries with the given reason
    pub fn count(&self, reason: DropReason) -> usize {
        self.entries.iter().filter(|e| e.reason == reason).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DroppedComment> {
        self.entries.iter()
    }

    /// Hand the retained entries to the caller (for replay) and empty the list
    pub fn drain(&mut self) -> impl Iterator<Item = DroppedComment> + '_ {
        self.entries.drain(..)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for OverflowList {
    fn default() -> Self {
        Self::new(Some(200))
    }
}
