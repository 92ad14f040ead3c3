//! Rule thresholds and their TOML document.
//!
//! ```toml
//! [sewer]
//! min_slope_percent = 0.5
//! max_slope_percent = 10.0
//!
//! [ada]
//! max_ramp_slope_percent = 8.33
//! max_ramp_stroke_width = 3.0
//!
//! [schedule]
//! tolerance_percent = 10.0
//! ```
//!
//! Every key is optional. [`QaThresholds::load`] never fails: a missing,
//! unreadable or malformed document yields the defaults above.

use std::{fs, path::Path};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Gravity pipe slope limits, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SewerThresholds {
    pub min_slope_percent: f64,
    pub max_slope_percent: f64,
}

impl Default for SewerThresholds {
    fn default() -> Self {
        Self {
            min_slope_percent: 0.5,
            max_slope_percent: 10.0,
        }
    }
}

/// Accessible ramp limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaThresholds {
    pub max_ramp_slope_percent: f64,
    /// Widest stroke, in page units, expected for a ramp outline.
    pub max_ramp_stroke_width: f64,
    /// Radius around a ramp searched for its label and grade, in page units.
    pub label_radius: f64,
}

impl Default for AdaThresholds {
    fn default() -> Self {
        Self {
            max_ramp_slope_percent: 8.33,
            max_ramp_stroke_width: 3.0,
            label_radius: 40.0,
        }
    }
}

/// Earthwork schedule reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleThresholds {
    /// Largest accepted relative difference, in percent.
    pub tolerance_percent: f64,
}

impl Default for ScheduleThresholds {
    fn default() -> Self {
        Self {
            tolerance_percent: 10.0,
        }
    }
}

/// All QA thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaThresholds {
    pub sewer: SewerThresholds,
    pub ada: AdaThresholds,
    pub schedule: ScheduleThresholds,
}

impl QaThresholds {
    /// Parses a threshold document.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed documents or mistyped values.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Loads thresholds from `path`, falling back to the defaults.
    pub fn load(path: &Path) -> Self {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                warn!(path:? = path, err:%; "QA thresholds unreadable, using defaults");
                return Self::default();
            }
        };
        match Self::from_toml(&source) {
            Ok(thresholds) => {
                debug!(path:? = path, thresholds:?; "QA thresholds loaded");
                thresholds
            }
            Err(err) => {
                warn!(path:? = path, err:%; "QA thresholds invalid, using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let thresholds = QaThresholds::from_toml("[sewer]\nmin_slope_percent = 1.0\n").unwrap();
        assert_eq!(thresholds.sewer.min_slope_percent, 1.0);
        assert_eq!(thresholds.sewer.max_slope_percent, 10.0);
        assert_eq!(thresholds.ada, AdaThresholds::default());
        assert_eq!(thresholds.schedule.tolerance_percent, 10.0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let thresholds = QaThresholds::load(&dir.path().join("missing.toml"));
        assert_eq!(thresholds, QaThresholds::default());
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[sewer]\nmin_slope_percent = \"steep\"").unwrap();
        assert_eq!(QaThresholds::load(file.path()), QaThresholds::default());
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\ntolerance_percent = 25.0").unwrap();
        assert_eq!(QaThresholds::load(file.path()).schedule.tolerance_percent, 25.0);
    }
}
