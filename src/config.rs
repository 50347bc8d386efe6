//! Resolved launcher configuration.
//!
//! Hosts may build this in code or deserialize it from any serde format;
//! every field has a default so partial documents are accepted.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::channel::MAX_LANES;

/// Error type for configuration validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("lane count must be between 1 and {max}, got {got}")]
    LaneCount { got: usize, max: usize },
    #[error("queue capacity must be at least 1")]
    QueueCapacity,
    #[error("tick interval must be at least 1 ms")]
    TickInterval,
    #[error("travel duration must be at least 1 ms")]
    TravelDuration,
    #[error("base font size must be at least 1 px")]
    FontSize,
}

/// What the scheduler does when no lane can host the front comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoChannelPolicy {
    /// Discard immediately and move on
    #[default]
    Drop,
    /// Keep it at the head for one more tick, then discard
    RetryOnce,
}

/// External comment-source program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCommand {
    pub program: PathBuf,
    /// Arguments placed before the generated ones
    pub args: Vec<String>,
}

impl Default for SourceCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("danmaku-source"),
            args: Vec::new(),
        }
    }
}

/// Launcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub room_url: String,
    pub socket_path: PathBuf,
    pub source: SourceCommand,

    pub lane_count: usize,
    /// Derive the lane count from the surface height on `set_scale`
    pub auto_lane_count: bool,
    pub queue_capacity: usize,
    pub tick_interval_ms: u64,
    /// Time for a comment to cross the full surface width
    pub travel_duration_ms: i64,

    pub base_font_size: u32,
    pub font_scale: f64,
    /// 0.0 (opaque) to 1.0, forwarded to the source as two hex digits
    pub font_alpha: f64,
    pub show_nick: bool,
    pub nick_separator: String,
    pub field_delimiter: char,

    pub no_channel_policy: NoChannelPolicy,
    /// Consecutive failed lane scans before every lane is forced free (0 disables)
    pub exhaustion_limit: u32,
    pub overflow_cap: Option<usize>,
    pub restart_gap_ms: u64,
    pub max_lead_ms: i64,
    pub max_extrapolation_ms: i64,
    pub seek_threshold_ms: i64,
    /// Repeat filter window in video-relative ms (0 disables)
    pub repeat_window_ms: i64,
    pub repeat_history: usize,
    pub rng_seed: Option<u64>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            room_url: String::new(),
            socket_path: std::env::temp_dir().join("danmaku-launcher.sock"),
            source: SourceCommand::default(),
            lane_count: 14,
            auto_lane_count: false,
            queue_capacity: 20,
            tick_interval_ms: 100,
            travel_duration_ms: 8000,
            base_font_size: 40,
            font_scale: 1.0,
            font_alpha: 0.0,
            show_nick: false,
            nick_separator: ": ".to_string(),
            field_delimiter: '\t',
            no_channel_policy: NoChannelPolicy::Drop,
            exhaustion_limit: 14,
            overflow_cap: Some(200),
            restart_gap_ms: 500,
            max_lead_ms: 3000,
            max_extrapolation_ms: 1000,
            seek_threshold_ms: 1500,
            repeat_window_ms: 10_000,
            repeat_history: 64,
            rng_seed: None,
        }
    }
}

impl LauncherConfig {
    /// Create a config for a room with every other setting at its default
    pub fn for_room(room_url: impl Into<String>) -> Self {
        Self {
            room_url: room_url.into(),
            ..Self::default()
        }
    }

    /// Check the settings the engine cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lane_count == 0 || self.lane_count > MAX_LANES {
            return Err(ConfigError::LaneCount {
                got: self.lane_count,
                max: MAX_LANES,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacity);
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        if self.travel_duration_ms <= 0 {
            return Err(ConfigError::TravelDuration);
        }
        if self.base_font_size == 0 {
            return Err(ConfigError::FontSize);
        }
        Ok(())
    }
}
