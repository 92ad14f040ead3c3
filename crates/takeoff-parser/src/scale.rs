//! Scale label parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::parse_number;

static FEET_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(?:ft|feet)\b").expect("valid feet label regex")
});

static RATIO_NOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\b1\s*(?:"|''|”|in\.?|inch)\s*=\s*(\d[\d,]*(?:\.\d+)?)\s*(?:'|’|ft\b\.?|feet\b)"#,
    )
    .expect("valid ratio note regex")
});

/// Page units per inch of paper.
pub const UNITS_PER_INCH: f64 = 72.0;

/// Returns true if the text mentions a drawing scale.
pub fn mentions_scale(text: &str) -> bool {
    text.to_ascii_lowercase().contains("scale")
}

/// Finds the first positive `<number> ft` length in `text`.
///
/// Zero-length tick labels (`0 FT`) are skipped.
///
/// # Examples
///
/// ```
/// # use takeoff_parser::scale::parse_feet_label;
/// assert_eq!(parse_feet_label("0 50 100 FT"), Some(100.0));
/// assert_eq!(parse_feet_label("GRAPHIC SCALE"), None);
/// ```
pub fn parse_feet_label(text: &str) -> Option<f64> {
    FEET_LABEL
        .captures_iter(text)
        .filter_map(|caps| parse_number(&caps[1]).ok())
        .find(|value| value.is_finite() && *value > 0.0)
}

/// Parses a written scale note such as `1" = 40'` into feet per inch.
pub fn parse_ratio_note(text: &str) -> Option<f64> {
    RATIO_NOTE
        .captures(text)
        .and_then(|caps| parse_number(&caps[1]).ok())
        .filter(|value| value.is_finite() && *value > 0.0)
}
