//! Playback clock as seen by the scheduler.
//! The host player pushes positions; between reports the clock extrapolates
//! with wall time, capped so a paused video does not run away.
//! With no position ever reported it falls back to wall-clock deltas.

use std::time::Instant;
use crate::core::time::{self, Millis};

/// Video-relative clock fed by `positionChanged` / `durationChanged`
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    origin: Instant,
    /// Last reported position and the wall time it was reported at
    last_report: Option<(Millis, Instant)>,
    duration: Option<Millis>,
    max_extrapolation: Millis,
    seek_threshold: Millis,
}

impl PlaybackClock {
    pub fn new(max_extrapolation: Millis, seek_threshold: Millis) -> Self {
        Self {
            origin: Instant::now(),
            last_report: None,
            duration: None,
            max_extrapolation: max_extrapolation.max(0),
            seek_threshold: seek_threshold.max(0),
        }
    }

    /// Record a new position. Returns `true` when the position jumped
    /// backwards by more than the seek threshold.
    pub fn on_position_changed(&mut self, position_ms: f64) -> bool {
        self.on_position_changed_at(position_ms, Instant::now())
    }

    pub fn on_position_changed_at(&mut self, position_ms: f64, at: Instant) -> bool {
        let position = time::from_millis_f64(position_ms);
        let jumped_back = match self.last_report {
            Some((previous, _)) => previous.saturating_sub(position) > self.seek_threshold,
            None => false,
        };
        self.last_report = Some((position, at));
        jumped_back
    }

    pub fn on_duration_changed(&mut self, duration_ms: f64) {
        self.duration = Some(time::from_millis_f64(duration_ms).max(0));
    }

    pub fn duration(&self) -> Option<Millis> {
        self.duration
    }

    /// A position has been reported at least once
    pub fn is_driven(&self) -> bool {
        self.last_report.is_some()
    }

    pub fn now_ms(&self) -> Millis {
        self.now_ms_at(Instant::now())
    }

    /// Current video-relative time as of the wall time `at`
    pub fn now_ms_at(&self, at: Instant) -> Millis {
        match self.last_report {
            Some((position, reported)) => {
                let elapsed = elapsed_ms(reported, at).min(self.max_extrapolation);
                position.saturating_add(elapsed)
            }
            None => elapsed_ms(self.origin, at),
        }
    }

    /// Forget every report; the clock falls back to wall time from now
    pub fn reset(&mut self) {
        self.origin = Instant::now();
        self.last_report = None;
        self.duration = None;
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(1000, 1500)
    }
}

fn elapsed_ms(from: Instant, to: Instant) -> Millis {
    let elapsed = to.saturating_duration_since(from).as_millis();
    Millis::try_from(elapsed).unwrap_or(Millis::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_wall_clock_fallback() {
        let clock = PlaybackClock::default();
        assert!(!clock.is_driven());
        let later = clock.origin + Duration::from_millis(250);
        assert_eq!(clock.now_ms_at(later), 250);
    }

    #[test]
    fn test_extrapolates_between_reports() {
        let mut clock = PlaybackClock::new(1000, 1500);
        let t0 = Instant::now();
        clock.on_position_changed_at(5000.4, t0);
        assert_eq!(clock.now_ms_at(t0), 5000);
        assert_eq!(clock.now_ms_at(t0 + Duration::from_millis(40)), 5040);
    }

    #[test]
    fn test_extrapolation_is_capped_when_paused() {
        let mut clock = PlaybackClock::new(1000, 1500);
        let t0 = Instant::now();
        clock.on_position_changed_at(5000.0, t0);
        assert_eq!(clock.now_ms_at(t0 + Duration::from_secs(60)), 6000);
    }

    #[test]
    fn test_backward_seek_detection() {
        let mut clock = PlaybackClock::new(1000, 1500);
        let t0 = Instant::now();
        assert!(!clock.on_position_changed_at(10_000.0, t0));
        assert!(!clock.on_position_changed_at(9_000.0, t0)); // small jitter
        assert!(clock.on_position_changed_at(2_000.0, t0));
        assert!(!clock.on_position_changed_at(60_000.0, t0)); // forward seek
    }

    #[test]
    fn test_extreme_positions_do_not_overflow() {
        let mut clock = PlaybackClock::new(1000, 1500);
        let t0 = Instant::now();
        assert!(!clock.on_position_changed_at(f64::NEG_INFINITY, t0));
        assert!(!clock.on_position_changed_at(f64::INFINITY, t0));
        assert_eq!(clock.now_ms_at(t0 + Duration::from_millis(10)), Millis::MAX);
        assert!(clock.on_position_changed_at(f64::NEG_INFINITY, t0));
        assert_eq!(clock.now_ms_at(t0), Millis::MIN);
    }

    #[test]
    fn test_duration() {
        let mut clock = PlaybackClock::default();
        assert_eq!(clock.duration(), None);
        clock.on_duration_changed(90_500.0);
        assert_eq!(clock.duration(), Some(90_500));
        clock.reset();
        assert_eq!(clock.duration(), None);
        assert!(!clock.is_driven());
    }
}
