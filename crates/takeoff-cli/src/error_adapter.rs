//! Error adapter for converting TakeoffError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's rich diagnostic formatting used in the CLI.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use takeoff::TakeoffError;

/// Adapter for [`TakeoffError`] variants.
///
/// Takeoff errors carry no source spans, so the adapter contributes an error
/// code and, where the user can act on it, a help line.
pub struct ErrorAdapter<'a>(pub &'a TakeoffError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TakeoffError::Io(_) => "takeoff::io",
            TakeoffError::InvalidManualScale(_) => "takeoff::calibration",
            TakeoffError::Config(_) => "takeoff::config",
            TakeoffError::Source(_) => "takeoff::source",
            TakeoffError::Export(_) => "takeoff::export",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TakeoffError::InvalidManualScale(_) => {
                "pass a positive feet-per-unit value to --scale, or omit it to detect the scale bar"
            }
            TakeoffError::Config(_) => "check the TOML file passed to --config",
            TakeoffError::Source(_) => "check the document path and the --page, --sheet and --legend-page indices",
            TakeoffError::Io(_) | TakeoffError::Export(_) => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}
