//! Per-tick display decisions.
//!
//! Each tick looks at exactly one ring slot, which paces visual density:
//! empty or consumed slots are skipped for free, a pending comment is
//! measured, given a lane, and sent to the renderer, or dropped when no lane
//! is free.

use tracing::{debug, trace};
use crate::channel::{clear_duration_ms, ChannelAllocator};
use crate::config::{LauncherConfig, NoChannelPolicy};
use crate::core::comment::{parse_line, CommentRecord};
use crate::core::time::{format_time, Millis};
use crate::events::{EventSink, LaneResetReason, LauncherEvent};
use crate::playback::settings::DisplaySettings;
use crate::queue::{CommentQueue, DropReason, OverflowList, RepeatFilter, Slot};
use crate::render::{DisplayCommand, Renderer, WidthOracle};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Slot under the read cursor was empty or already consumed
    Skipped,
    /// Front comment is scheduled a little ahead of the clock
    Waiting,
    /// Placeholder consumed without a lane lookup
    Voided,
    Displayed { lane_index: u16 },
    /// No lane; kept for one retry on the next tick
    Deferred,
    /// No lane; discarded
    Dropped,
}

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LauncherStats {
    /// Driver ticks, including those that found the source idle
    pub ticks: u64,
    pub ingested: u64,
    pub malformed: u64,
    pub repeated: u64,
    pub overwritten: u64,
    pub displayed: u64,
    pub voided: u64,
    pub dropped_no_channel: u64,
    pub exhaustion_resets: u64,
    pub seek_resets: u64,
}

pub struct Scheduler {
    queue: CommentQueue,
    allocator: ChannelAllocator,
    overflow: OverflowList,
    repeat_filter: RepeatFilter,
    settings: DisplaySettings,
    travel_duration: Millis,
    max_lead: Millis,
    policy: NoChannelPolicy,
    delimiter: char,
    next_arrival: u64,
    stats: LauncherStats,
}

impl Scheduler {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            queue: CommentQueue::new(config.queue_capacity),
            allocator: ChannelAllocator::new(
                config.lane_count,
                config.exhaustion_limit,
                config.rng_seed,
            ),
            overflow: OverflowList::new(config.overflow_cap),
            repeat_filter: RepeatFilter::new(config.repeat_window_ms, config.repeat_history),
            settings: DisplaySettings::from_config(config),
            travel_duration: config.travel_duration_ms.max(1),
            max_lead: config.max_lead_ms.max(0),
            policy: config.no_channel_policy,
            delimiter: config.field_delimiter,
            next_arrival: 0,
            stats: LauncherStats::default(),
        }
    }

    pub fn queue(&self) -> &CommentQueue {
        &self.queue
    }

    pub fn allocator(&self) -> &ChannelAllocator {
        &self.allocator
    }

    pub fn allocator_mut(&mut self) -> &mut ChannelAllocator {
        &mut self.allocator
    }

    pub fn overflow(&self) -> &OverflowList {
        &self.overflow
    }

    pub fn overflow_mut(&mut self) -> &mut OverflowList {
        &mut self.overflow
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut DisplaySettings {
        &mut self.settings
    }

    pub fn stats(&self) -> LauncherStats {
        self.stats
    }

    /// Parse a raw source line and queue it. Returns the arrival order
    /// assigned to the record, or `None` if it was rejected.
    pub fn ingest_line(&mut self, line: &str, events: &EventSink) -> Option<u64> {
        match parse_line(line, self.delimiter, self.next_arrival) {
            Ok(record) => {
                self.next_arrival += 1;
                self.ingest(record, events)
            }
            Err(reason) => {
                self.stats.malformed += 1;
                debug!(%reason, "ignored malformed line");
                events.emit(LauncherEvent::IgnoredMalformedLine {
                    line: line.trim_end().to_string(),
                    reason,
                });
                None
            }
        }
    }

    /// Queue an already parsed record (repeat filter, then ring)
    pub fn ingest(&mut self, record: CommentRecord, events: &EventSink) -> Option<u64> {
        let arrival_order = record.arrival_order;
        let message = record.message(&self.settings.nick_separator);
        if !record.is_placeholder() && !self.repeat_filter.accept(message, record.scheduled_pts) {
            self.stats.repeated += 1;
            trace!(arrival_order, "repeat filtered");
            events.emit(LauncherEvent::RepeatFiltered { arrival_order });
            self.overflow.push(record, DropReason::Repeated);
            return None;
        }

        self.stats.ingested += 1;
        if let Some(lost) = self.queue.push(record) {
            self.stats.overwritten += 1;
            events.emit(LauncherEvent::QueueOverwrite {
                arrival_order: lost.arrival_order,
            });
            self.overflow.push(lost, DropReason::Overwritten);
        }
        Some(arrival_order)
    }

    /// Make one display decision at video time `now`.
    pub fn tick<R, W>(
        &mut self,
        now: Millis,
        oracle: &W,
        renderer: &mut R,
        events: &EventSink,
    ) -> TickOutcome
    where
        R: Renderer + ?Sized,
        W: WidthOracle + ?Sized,
    {
        self.allocator.sweep(now);

        let (text, retried, arrival_order) = match self.queue.front() {
            Slot::Empty | Slot::Consumed => {
                self.queue.advance();
                return TickOutcome::Skipped;
            }
            Slot::Pending(record) => {
                let lead = record.scheduled_pts.saturating_sub(now);
                if lead > 0 && lead <= self.max_lead {
                    return TickOutcome::Waiting;
                }
                let text = (!record.is_placeholder())
                    .then(|| self.settings.format(record).to_string());
                (text, record.retried, record.arrival_order)
            }
        };

        let Some(text) = text else {
            self.queue.consume_front();
            self.stats.voided += 1;
            trace!(arrival_order, "void comment");
            return TickOutcome::Voided;
        };

        let font_size_px = self.settings.font_size_px();
        let width = oracle.measure_width(&text, font_size_px).max(0);
        let surface = i32::try_from(self.settings.surface_width).unwrap_or(i32::MAX);
        let clear = clear_duration_ms(width, self.travel_duration, surface);

        match self.allocator.allocate(now, width, clear) {
            Ok(allocation) => {
                self.queue.consume_front();
                if allocation.after_reset {
                    self.stats.exhaustion_resets += 1;
                    events.emit(LauncherEvent::LanesReset {
                        reason: LaneResetReason::Exhaustion,
                        at: now,
                    });
                }
                let command = DisplayCommand {
                    text,
                    lane_index: allocation.lane_index,
                    lane_count: self.allocator.lane_count() as u16,
                    start_x: surface,
                    end_x: -width,
                    duration_ms: travel_time(self.travel_duration, surface, width),
                    font_size_px,
                    font_alpha: self.settings.font_alpha().to_string(),
                };
                debug!(
                    at = %format_time(now),
                    lane = command.lane_index,
                    width,
                    clear,
                    "display comment"
                );
                self.stats.displayed += 1;
                renderer.display(command);
                TickOutcome::Displayed {
                    lane_index: allocation.lane_index,
                }
            }
            Err(_) if self.policy == NoChannelPolicy::RetryOnce && !retried => {
                if let Slot::Pending(record) = self.queue.front() {
                    record.retried = true;
                }
                TickOutcome::Deferred
            }
            Err(_) => {
                if let Some(record) = self.queue.consume_front() {
                    self.overflow.push(record, DropReason::NoChannel);
                }
                self.stats.dropped_no_channel += 1;
                events.emit(LauncherEvent::NoChannelAvailable {
                    arrival_order,
                    width_px: width,
                });
                TickOutcome::Dropped
            }
        }
    }

    /// Empty the ring and forget recent texts
    pub fn reinit_queue(&mut self) {
        self.queue.reinit();
        self.repeat_filter.clear();
    }

    /// Force every lane free (seek or host request)
    pub fn reset_lanes(&mut self, reason: LaneResetReason, now: Millis, events: &EventSink) {
        self.allocator.reset_all();
        if reason == LaneResetReason::Seek {
            self.stats.seek_resets += 1;
        }
        debug!(?reason, "lanes reset");
        events.emit(LauncherEvent::LanesReset { reason, at: now });
    }

    /// Regenerate the lane pool with `lane_count` lanes
    pub fn resize_lanes(&mut self, lane_count: usize, now: Millis, events: &EventSink) {
        if lane_count.clamp(1, crate::channel::MAX_LANES) == self.allocator.lane_count() {
            return;
        }
        self.allocator.resize(lane_count);
        events.emit(LauncherEvent::LanesReset {
            reason: LaneResetReason::Resize,
            at: now,
        });
    }
}

/// Time for text of `width` to fully cross a surface of `surface` pixels at
/// the velocity that crosses the bare surface in `travel`.
fn travel_time(travel: Millis, surface: i32, width: i32) -> Millis {
    let surface = i64::from(surface.max(1));
    travel.saturating_mul(surface + i64::from(width.max(0))) / surface
}
