//! Text width measurement.
//!
//! Real hosts measure with their font engine. `ApproxWidthOracle` is a
//! stand-in that needs no fonts.

/// Rendered width of `text` at `font_size_px`, in pixels
pub trait WidthOracle {
    fn measure_width(&self, text: &str, font_size_px: i32) -> i32;
}

impl<F> WidthOracle for F
where
    F: Fn(&str, i32) -> i32,
{
    fn measure_width(&self, text: &str, font_size_px: i32) -> i32 {
        self(text, font_size_px)
    }
}

/// Full-width (CJK, kana, hangul, fullwidth forms) glyphs count as one em,
/// everything else as half an em.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxWidthOracle;

impl WidthOracle for ApproxWidthOracle {
    fn measure_width(&self, text: &str, font_size_px: i32) -> i32 {
        let half_ems: i64 = text
            .chars()
            .map(|c| if is_wide(c) { 2 } else { 1 })
            .sum();
        let px = half_ems * i64::from(font_size_px.max(0)) / 2;
        px.min(i64::from(i32::MAX)) as i32
    }
}

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1FAFF
        | 0x20000..=0x3FFFD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_half_em() {
        assert_eq!(ApproxWidthOracle.measure_width("abcd", 40), 80);
    }

    #[test]
    fn test_cjk_is_full_em() {
        assert_eq!(ApproxWidthOracle.measure_width("弹幕", 40), 80);
        assert_eq!(ApproxWidthOracle.measure_width("弹幕ok", 40), 120);
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |text: &str, size: i32| text.len() as i32 * size;
        assert_eq!(oracle.measure_width("abc", 10), 30);
    }
}
