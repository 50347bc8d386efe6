//! Display settings shared by width measurement and text formatting.
//! Changes apply from the next tick; comments already on screen keep the
//! settings they were launched with.

use crate::config::LauncherConfig;
use crate::core::comment::CommentRecord;

/// Surface height the base font size is designed for
pub const REFERENCE_HEIGHT: u32 = 1080;
pub const MIN_FONT_SCALE: f64 = 0.1;
pub const MAX_FONT_SCALE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySettings {
    pub surface_width: u32,
    pub surface_height: u32,
    pub base_font_size: u32,
    font_scale: f64,
    font_alpha: String,
    pub show_nick: bool,
    pub nick_separator: String,
}

impl DisplaySettings {
    pub fn from_config(config: &LauncherConfig) -> Self {
        let mut settings = Self {
            surface_width: 1920,
            surface_height: REFERENCE_HEIGHT,
            base_font_size: config.base_font_size.max(1),
            font_scale: 1.0,
            font_alpha: "00".to_string(),
            show_nick: config.show_nick,
            nick_separator: config.nick_separator.clone(),
        };
        settings.set_font(config.font_scale, config.font_alpha);
        settings
    }

    /// Surface size in pixels; zero dimensions are bumped to one
    pub fn set_scale(&mut self, width: u32, height: u32) {
        self.surface_width = width.max(1);
        self.surface_height = height.max(1);
    }

    /// Height relative to the reference surface
    pub fn scale(&self) -> f64 {
        f64::from(self.surface_height) / f64::from(REFERENCE_HEIGHT)
    }

    /// Negative values leave the corresponding setting unchanged
    pub fn set_font(&mut self, font_scale: f64, font_alpha: f64) {
        if font_scale >= 0.0 {
            self.font_scale = font_scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
        }
        if font_alpha >= 0.0 {
            self.font_alpha = alpha_hex(font_alpha);
        }
    }

    pub fn adjust_font_scale(&mut self, delta: f64) {
        if delta.is_finite() {
            self.font_scale = (self.font_scale + delta).clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
        }
    }

    pub fn toggle_nick(&mut self) -> bool {
        self.show_nick = !self.show_nick;
        self.show_nick
    }

    pub fn font_scale(&self) -> f64 {
        self.font_scale
    }

    pub fn font_alpha(&self) -> &str {
        &self.font_alpha
    }

    pub fn font_size_px(&self) -> i32 {
        let px = (f64::from(self.base_font_size) * self.scale() * self.font_scale).round();
        (px as i32).max(1)
    }

    /// Vertical room one lane needs
    pub fn line_height_px(&self) -> u32 {
        (self.font_size_px() as u32).saturating_mul(5) / 4
    }

    /// Text as it should appear on screen
    pub fn format<'a>(&self, record: &'a CommentRecord) -> &'a str {
        if self.show_nick {
            &record.text
        } else {
            record.message(&self.nick_separator)
        }
    }
}

/// 0.0..=1.0 alpha as two upper-case hex digits
pub fn alpha_hex(alpha: f64) -> String {
    let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
    format!("{:02X}", (alpha * 255.0).round() as u8)
}
