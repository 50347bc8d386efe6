//! Occupancy bookkeeping for a single display lane.

use crate::core::time::Millis;

/// Time a lane stays occupied after a comment of `width_px` enters it.
///
/// The lane frees up once the tail of the text has fully entered the
/// surface, i.e. after the text has moved by its own width at the scroll
/// velocity `reference_width_px / travel_ms`.
pub fn clear_duration_ms(width_px: i32, travel_ms: Millis, reference_width_px: i32) -> Millis {
    let width = i64::from(width_px.max(0));
    let reference = i64::from(reference_width_px.max(1));
    (travel_ms.max(0).saturating_mul(width) / reference).max(0)
}

/// Occupancy record for one lane. `occupied_since == None` means free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneOccupancy {
    pub lane_index: u16,
    pub occupied_since: Option<Millis>,
    pub clear_duration_ms: Millis,
    pub text_width_px: i32,
}

impl LaneOccupancy {
    pub fn free(lane_index: u16) -> Self {
        Self {
            lane_index,
            occupied_since: None,
            clear_duration_ms: 0,
            text_width_px: 0,
        }
    }

    /// A lane whose occupant started in the future (the clock went
    /// backwards) counts as busy.
    pub fn is_free_at(&self, now: Millis) -> bool {
        match self.occupied_since {
            None => true,
            Some(since) => now >= since && now - since >= self.clear_duration_ms,
        }
    }

    /// Time the current occupant releases the lane, if occupied
    pub fn clears_at(&self) -> Option<Millis> {
        self.occupied_since
            .map(|since| since.saturating_add(self.clear_duration_ms))
    }

    pub fn occupy(&mut self, now: Millis, clear_duration_ms: Millis, width_px: i32) {
        self.occupied_since = Some(now);
        self.clear_duration_ms = clear_duration_ms.max(0);
        self.text_width_px = width_px;
    }

    pub fn release(&mut self) {
        *self = Self::free(self.lane_index);
    }
}
