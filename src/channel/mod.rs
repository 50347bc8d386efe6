//! Display lanes and the allocator that hands them out.

pub mod allocator;
pub mod lane;

pub use allocator::{Allocation, ChannelAllocator, NoChannelAvailable, MAX_LANES};
pub use lane::{clear_duration_ms, LaneOccupancy};
