//! Lane selection for scrolling comments.
//!
//! Each allocation scans every lane once in a freshly shuffled order so no
//! index is favored. If a scan finds nothing, the allocator reports
//! `NoChannelAvailable`; after `exhaustion_limit` consecutive failed scans it
//! assumes its bookkeeping is stuck, forces every lane free, and retries once.

use tracing::{debug, warn};
use crate::channel::lane::LaneOccupancy;
use crate::core::time::Millis;

/// Upper bound on the number of lanes
pub const MAX_LANES: usize = 30;

/// No lane can host the comment right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no channel available ({consecutive_failures} consecutive failed scans)")]
pub struct NoChannelAvailable {
    pub consecutive_failures: u32,
}

/// Successful lane assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub lane_index: u16,
    /// The exhaustion safety valve fired to make room
    pub after_reset: bool,
}

pub struct ChannelAllocator {
    lanes: Vec<LaneOccupancy>,
    scan_order: Vec<usize>,
    rng: fastrand::Rng,
    exhaustion_limit: u32,
    consecutive_failures: u32,
    reset_count: u64,
}

impl ChannelAllocator {
    /// Create an allocator with `lane_count` free lanes (clamped to `1..=MAX_LANES`)
    pub fn new(lane_count: usize, exhaustion_limit: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut allocator = Self {
            lanes: Vec::new(),
            scan_order: Vec::new(),
            rng,
            exhaustion_limit,
            consecutive_failures: 0,
            reset_count: 0,
        };
        allocator.resize(lane_count);
        allocator
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lanes(&self) -> &[LaneOccupancy] {
        &self.lanes
    }

    pub fn lane(&self, index: usize) -> Option<&LaneOccupancy> {
        self.lanes.get(index)
    }

    /// How many times the exhaustion valve has fired
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn free_lanes(&self, now: Millis) -> usize {
        self.lanes.iter().filter(|lane| lane.is_free_at(now)).count()
    }

    /// Regenerate the lane pool with a new size; every lane starts free
    pub fn resize(&mut self, lane_count: usize) {
        let lane_count = lane_count.clamp(1, MAX_LANES);
        self.lanes = (0..lane_count)
            .map(|index| LaneOccupancy::free(index as u16))
            .collect();
        self.scan_order = (0..lane_count).collect();
        self.consecutive_failures = 0;
    }

    /// Release every lane whose occupant has cleared by `now`
    pub fn sweep(&mut self, now: Millis) -> usize {
        let mut released = 0;
        for lane in &mut self.lanes {
            if lane.occupied_since.is_some() && lane.is_free_at(now) {
                lane.release();
                released += 1;
            }
        }
        released
    }

    /// Force every lane free
    pub fn reset_all(&mut self) {
        for lane in &mut self.lanes {
            lane.release();
        }
        self.consecutive_failures = 0;
    }

    /// Place an occupant directly, bypassing the scan
    pub fn occupy(&mut self, lane_index: usize, since: Millis, clear_duration_ms: Millis, width_px: i32) {
        if let Some(lane) = self.lanes.get_mut(lane_index) {
            lane.occupy(since, clear_duration_ms, width_px);
        }
    }

    /// Find a free lane for a comment of `width_px` and mark it occupied.
    pub fn allocate(
        &mut self,
        now: Millis,
        width_px: i32,
        clear_duration_ms: Millis,
    ) -> Result<Allocation, NoChannelAvailable> {
        if let Some(lane_index) = self.scan(now) {
            self.consecutive_failures = 0;
            self.lanes[lane_index].occupy(now, clear_duration_ms, width_px);
            return Ok(Allocation {
                lane_index: lane_index as u16,
                after_reset: false,
            });
        }

        self.consecutive_failures += 1;
        if self.exhaustion_limit == 0 || self.consecutive_failures < self.exhaustion_limit {
            debug!(
                now,
                failures = self.consecutive_failures,
                "no free lane"
            );
            return Err(NoChannelAvailable {
                consecutive_failures: self.consecutive_failures,
            });
        }

        warn!(
            now,
            failures = self.consecutive_failures,
            "lane scan exhausted repeatedly, forcing all lanes free"
        );
        self.reset_all();
        self.reset_count += 1;

        match self.scan(now) {
            Some(lane_index) => {
                self.lanes[lane_index].occupy(now, clear_duration_ms, width_px);
                Ok(Allocation {
                    lane_index: lane_index as u16,
                    after_reset: true,
                })
            }
            None => {
                self.consecutive_failures += 1;
                Err(NoChannelAvailable {
                    consecutive_failures: self.consecutive_failures,
                })
            }
        }
    }

    fn scan(&mut self, now: Millis) -> Option<usize> {
        self.rng.shuffle(&mut self.scan_order);
        self.scan_order
            .iter()
            .copied()
            .find(|&index| self.lanes[index].is_free_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::lane::clear_duration_ms;
    use std::collections::HashMap;

    #[test]
    fn test_all_busy_then_free() {
        let mut allocator = ChannelAllocator::new(14, 14, Some(7));
        for lane in 0..14 {
            allocator.occupy(lane, 0, 1000, 200);
        }

        let err = allocator.allocate(500, 200, 1000).unwrap_err();
        assert_eq!(err.consecutive_failures, 1);
        assert_eq!(allocator.reset_count(), 0);

        let allocation = allocator.allocate(1001, 200, 1000).unwrap();
        assert!(!allocation.after_reset);
        assert!(allocation.lane_index < 14);
        assert_eq!(allocator.consecutive_failures(), 0);
    }

    #[test]
    fn test_exhaustion_valve_fires_at_limit() {
        let mut allocator = ChannelAllocator::new(4, 3, Some(1));
        for lane in 0..4 {
            allocator.occupy(lane, 0, 10_000, 100);
        }

        assert!(allocator.allocate(10, 100, 500).is_err());
        assert!(allocator.allocate(20, 100, 500).is_err());
        let allocation = allocator.allocate(30, 100, 500).unwrap();
        assert!(allocation.after_reset);
        assert_eq!(allocator.reset_count(), 1);

        // only the new occupant remains
        assert_eq!(allocator.free_lanes(30), 3);
    }

    #[test]
    fn test_exhaustion_valve_disabled() {
        let mut allocator = ChannelAllocator::new(1, 0, Some(1));
        allocator.occupy(0, 0, 10_000, 100);
        for now in 0..50 {
            assert!(allocator.allocate(now, 100, 500).is_err());
        }
        assert_eq!(allocator.reset_count(), 0);
    }

    #[test]
    fn test_scan_is_not_biased_to_low_lanes() {
        let mut allocator = ChannelAllocator::new(16, 16, Some(42));
        let mut hits: HashMap<u16, usize> = HashMap::new();
        for _ in 0..1600 {
            let allocation = allocator.allocate(0, 10, 0).unwrap();
            *hits.entry(allocation.lane_index).or_default() += 1;
        }
        // zero clear duration keeps every lane free, so the pick is pure shuffle
        assert_eq!(hits.len(), 16);
        assert!(hits.values().all(|&n| n > 40));
    }

    #[test]
    fn test_lane_exclusivity_under_load() {
        // valve disabled: exclusivity only holds while no reset fires
        let mut allocator = ChannelAllocator::new(14, 0, Some(99));
        let mut rng = fastrand::Rng::with_seed(5);
        let mut intervals: HashMap<u16, Vec<(Millis, Millis)>> = HashMap::new();

        for tick in 0..5000 {
            let now = tick * 100;
            allocator.sweep(now);
            let width = rng.i32(20..1200);
            let clear = clear_duration_ms(width, 8000, 1920);
            if let Ok(allocation) = allocator.allocate(now, width, clear) {
                intervals
                    .entry(allocation.lane_index)
                    .or_default()
                    .push((now, now + clear));
            }
        }

        assert_eq!(allocator.reset_count(), 0);
        for spans in intervals.values() {
            for pair in spans.windows(2) {
                assert!(pair[1].0 >= pair[0].1, "overlap in lane: {:?}", pair);
            }
        }
    }

    #[test]
    fn test_reset_is_observable_under_overload() {
        let mut allocator = ChannelAllocator::new(2, 2, Some(11));
        let mut resets_seen = 0;
        for tick in 0..100 {
            if let Ok(allocation) = allocator.allocate(tick * 100, 500, 60_000) {
                if allocation.after_reset {
                    resets_seen += 1;
                }
            }
        }
        assert!(resets_seen > 0);
        assert_eq!(resets_seen as u64, allocator.reset_count());
    }

    #[test]
    fn test_resize_regenerates_pool() {
        let mut allocator = ChannelAllocator::new(14, 14, Some(3));
        allocator.occupy(2, 0, 1000, 10);
        allocator.resize(40);
        assert_eq!(allocator.lane_count(), MAX_LANES);
        assert_eq!(allocator.free_lanes(0), MAX_LANES);

        allocator.resize(0);
        assert_eq!(allocator.lane_count(), 1);
    }

    #[test]
    fn test_sweep_releases_expired() {
        let mut allocator = ChannelAllocator::new(3, 3, Some(3));
        allocator.occupy(0, 0, 100, 10);
        allocator.occupy(1, 0, 500, 10);
        assert_eq!(allocator.sweep(200), 1);
        assert_eq!(allocator.lane(0).unwrap().occupied_since, None);
        assert!(allocator.lane(1).unwrap().occupied_since.is_some());
    }
}
