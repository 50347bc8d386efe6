//! Video-relative time in milliseconds.
//! The player reports positions as floating point; everything past the
//! clock boundary works in whole milliseconds (i64).

/// Time in milliseconds relative to the start of the video
pub type Millis = i64;

/// Time constants for conversions
pub mod constants {
    use super::Millis;

    pub const MILLIS_PER_SECOND: Millis = 1_000;
    pub const MILLIS_PER_MINUTE: Millis = 60 * MILLIS_PER_SECOND;
    pub const MILLIS_PER_HOUR: Millis = 60 * MILLIS_PER_MINUTE;
}

/// Time zero constant
pub const ZERO: Millis = 0;

/// Convert seconds (f64) to milliseconds
#[inline]
pub fn from_seconds(seconds: f64) -> Millis {
    from_millis_f64(seconds * constants::MILLIS_PER_SECOND as f64)
}

/// Convert milliseconds to seconds (f64)
#[inline]
pub fn to_seconds(millis: Millis) -> f64 {
    millis as f64 / constants::MILLIS_PER_SECOND as f64
}

/// Convert a floating point millisecond value as reported by the player.
/// NaN maps to zero; infinities saturate.
#[inline]
pub fn from_millis_f64(millis: f64) -> Millis {
    if millis.is_nan() {
        return ZERO;
    }
    // `as` saturates for out-of-range floats
    millis.round() as Millis
}

/// Format time as HH:MM:SS.mmm (negative values are prefixed with '-')
pub fn format_time(millis: Millis) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    let hour = constants::MILLIS_PER_HOUR as u64;
    let minute = constants::MILLIS_PER_MINUTE as u64;
    let second = constants::MILLIS_PER_SECOND as u64;
    let hours = abs / hour;
    let minutes = (abs % hour) / minute;
    let seconds = (abs % minute) / second;
    let ms = abs % second;

    format!("{}{:02}:{:02}:{:02}.{:03}", sign, hours, minutes, seconds, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_conversion() {
        let time = from_seconds(1.5);
        assert_eq!(time, 1_500);
        assert!((to_seconds(time) - 1.5).abs() < 0.000001);
    }

    #[test]
    fn test_from_millis_f64_rounds() {
        assert_eq!(from_millis_f64(1499.4), 1499);
        assert_eq!(from_millis_f64(1499.6), 1500);
        assert_eq!(from_millis_f64(-2.6), -3);
    }

    #[test]
    fn test_from_millis_f64_non_finite() {
        assert_eq!(from_millis_f64(f64::NAN), ZERO);
        assert_eq!(from_millis_f64(f64::INFINITY), Millis::MAX);
        assert_eq!(from_millis_f64(f64::NEG_INFINITY), Millis::MIN);
    }

    #[test]
    fn test_format_time() {
        let time = from_seconds(3661.5); // 1 hour, 1 minute, 1.5 seconds
        assert_eq!(format_time(time), "01:01:01.500");
        assert_eq!(format_time(ZERO), "00:00:00.000");
        assert_eq!(format_time(-1_250), "-00:00:01.250");
    }
}
