//! Error types for label parsing.
//!
//! Label parsing is lenient by design at the table level: callers such as
//! [`EarthworkParser`](crate::EarthworkParser) turn these errors into zero or
//! absent contributions. The individual parsers still report why a value
//! could not be read so that diagnostics can say so.

use thiserror::Error;

/// A failure to read a value out of label text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("invalid station `{0}`")]
    InvalidStation(String),

    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parses a number that may contain thousands separators.
pub(crate) fn parse_number(text: &str) -> Result<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}
