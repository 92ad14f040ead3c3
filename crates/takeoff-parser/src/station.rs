//! Station (linear reference) parsing.
//!
//! Stations are written as `hundreds+remainder`, so `12+50.25` is 1250.25 ft
//! along the alignment.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ParseError, Result, parse_number};

const STATION: &str = r"\d+\+\d+(?:\.\d+)?";

static STA_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\bSTA\.?\s*({STATION}|\d+(?:\.\d+)?)\s*(?:TO|-|–|—)\s*(?:STA\.?\s*)?({STATION}|\d+(?:\.\d+)?)"
    ))
    .expect("valid station range regex")
});

static BARE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({STATION})\s*(?:TO|-|–|—)\s*({STATION})"))
        .expect("valid bare station range regex")
});

static STA_SINGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bSTA\.?\s*({STATION}|\d+(?:\.\d+)?)"))
        .expect("valid single station regex")
});

static BARE_STATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*({STATION})\s*$")).expect("valid bare station regex")
});

/// A station range as written on the sheet.
///
/// `end` is empty when only a single station was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRange {
    pub start: String,
    pub end: String,
}

/// Converts a station string to feet along the alignment.
///
/// # Errors
///
/// Returns [`ParseError::InvalidStation`] when the text is not a station.
///
/// # Examples
///
/// ```
/// # use takeoff_parser::station::station_to_feet;
/// assert_eq!(station_to_feet("12+50.25").unwrap(), 1250.25);
/// assert_eq!(station_to_feet("STA 0+75").unwrap(), 75.0);
/// assert!(station_to_feet("MH-3").is_err());
/// ```
pub fn station_to_feet(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("STA")
        .or_else(|| trimmed.strip_prefix("sta"))
        .map(|rest| rest.trim_start_matches('.').trim())
        .unwrap_or(trimmed);

    let invalid = || ParseError::InvalidStation(text.to_string());
    match body.split_once('+') {
        Some((hundreds, rest)) => {
            let hundreds = parse_number(hundreds).map_err(|_| invalid())?;
            let rest = parse_number(rest).map_err(|_| invalid())?;
            if hundreds < 0.0 || rest < 0.0 {
                return Err(invalid());
            }
            Ok(hundreds * 100.0 + rest)
        }
        None => parse_number(body).map_err(|_| invalid()),
    }
}

/// Finds a station or station range in free text.
///
/// Recognized forms, in priority order: `STA X TO Y` (or `STA X - STA Y`),
/// `X - Y` with both sides in `a+b` form, and a single `STA X`.
pub fn find_station_range(text: &str) -> Option<StationRange> {
    if let Some(caps) = STA_RANGE.captures(text) {
        return Some(StationRange {
            start: caps[1].to_string(),
            end: caps[2].to_string(),
        });
    }
    if let Some(caps) = BARE_RANGE.captures(text) {
        return Some(StationRange {
            start: caps[1].to_string(),
            end: caps[2].to_string(),
        });
    }
    STA_SINGLE.captures(text).map(|caps| StationRange {
        start: caps[1].to_string(),
        end: String::new(),
    })
}

/// Returns true if the whole text is a bare `a+b` station.
pub fn is_bare_station(text: &str) -> bool {
    BARE_STATION.is_match(text)
}
