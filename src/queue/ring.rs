//! Bounded circular pool of pending comments.
//!
//! Insertion order is the only order: the ring is not sorted by timestamp.
//! Under sustained overload new arrivals overwrite the oldest unread slot,
//! so the queue favors freshness over completeness.

use tracing::trace;
use crate::core::comment::CommentRecord;

/// View of the slot under the read cursor
#[derive(Debug)]
pub enum Slot<'a> {
    /// Never written since the last reinit
    Empty,
    /// Already displayed or discarded
    Consumed,
    /// Waiting for a display decision
    Pending(&'a mut CommentRecord),
}

/// Fixed-capacity ring with independent read and write cursors
#[derive(Debug)]
pub struct CommentQueue {
    slots: Vec<Option<CommentRecord>>,
    write_index: usize,
    read_index: usize,
    overwrites: u64,
}

impl CommentQueue {
    /// Create an empty ring. A zero capacity is bumped to one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            write_index: 0,
            read_index: 0,
            overwrites: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Total unread records lost to overwrites since creation
    pub fn overwrite_count(&self) -> u64 {
        self.overwrites
    }

    /// Number of slots holding an unread record
    pub fn unread_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Some(record) if !record.read))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.unread_len() == 0
    }

    /// Store a record in the next slot.
    ///
    /// Returns the unread record that was overwritten, if any. When the read
    /// cursor sits on the overwritten slot it moves forward with the write
    /// cursor so reading resumes at the oldest surviving record.
    pub fn push(&mut self, record: CommentRecord) -> Option<CommentRecord> {
        let capacity = self.capacity();
        let index = self.write_index;

        let displaced = self.slots[index].replace(record);
        let overwritten = displaced.filter(|old| !old.read);

        if let Some(old) = &overwritten {
            self.overwrites += 1;
            trace!(slot = index, arrival_order = old.arrival_order, "overwrote unread comment");
            if self.read_index == index {
                self.read_index = (index + 1) % capacity;
            }
        }

        self.write_index = (index + 1) % capacity;
        overwritten
    }

    /// Look at the slot under the read cursor without moving it
    pub fn front(&mut self) -> Slot<'_> {
        match self.slots[self.read_index].as_mut() {
            None => Slot::Empty,
            Some(record) if record.read => Slot::Consumed,
            Some(record) => Slot::Pending(record),
        }
    }

    /// Move the read cursor one slot forward (wraps)
    pub fn advance(&mut self) {
        self.read_index = (self.read_index + 1) % self.capacity();
    }

    /// Mark the front record read and advance. Returns a copy of the record.
    pub fn consume_front(&mut self) -> Option<CommentRecord> {
        let index = self.read_index;
        let consumed = match self.slots[index].as_mut() {
            Some(record) if !record.read => {
                record.read = true;
                Some(record.clone())
            }
            _ => None,
        };
        self.advance();
        consumed
    }

    /// Drop every slot and rewind both cursors
    pub fn reinit(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_index = 0;
        self.read_index = 0;
    }

    /// Records in physical slot order, for diagnostics
    pub fn slots(&self) -> impl Iterator<Item = Option<&CommentRecord>> {
        self.slots.iter().map(Option::as_ref)
    }
}

impl Default for CommentQueue {
    fn default() -> Self {
        Self::new(20)
    }
}
