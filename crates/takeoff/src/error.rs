//! Error types for takeoff operations.
//!
//! [`TakeoffError`] covers the few conditions that abort a run. Everything
//! else degrades softly: unresolved calibration is reported through
//! [`ScaleSource::Unknown`](takeoff_core::calibration::ScaleSource::Unknown),
//! unreadable rows contribute zero, and violation export returns `false`.

use std::io;

use thiserror::Error;

/// The main error type for takeoff operations.
#[derive(Debug, Error)]
pub enum TakeoffError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("manual scale must be a positive number of feet per unit, got {0}")]
    InvalidManualScale(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Geometry source error: {0}")]
    Source(String),

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error + Send + Sync>),
}

impl From<crate::export::Error> for TakeoffError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}
