//! Scale calibration results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a page's scale factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleSource {
    /// A drawn scale bar with a labeled length.
    ScaleBar,
    /// A caller-supplied factor.
    Manual,
    /// A written scale note such as `1" = 40'`.
    Dimension,
    /// Nothing usable was found; the caller must calibrate manually.
    #[default]
    Unknown,
}

impl fmt::Display for ScaleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScaleSource::ScaleBar => "scale_bar",
            ScaleSource::Manual => "manual",
            ScaleSource::Dimension => "dimension",
            ScaleSource::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Outcome of scale calibration.
///
/// `ft_per_unit` is present exactly when the source is not
/// [`ScaleSource::Unknown`], and is then strictly positive. The constructors
/// are the only way to build one, deserialization included, which keeps
/// that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CalibrationRepr")]
pub struct CalibrationResult {
    ft_per_unit: Option<f64>,
    scale_source: ScaleSource,
    notes: Vec<String>,
}

impl CalibrationResult {
    /// A resolved calibration.
    ///
    /// Returns an unresolved result instead when `ft_per_unit` is not a
    /// positive finite number.
    pub fn resolved(ft_per_unit: f64, scale_source: ScaleSource, notes: Vec<String>) -> Self {
        if ft_per_unit.is_finite() && ft_per_unit > 0.0 && scale_source != ScaleSource::Unknown {
            Self {
                ft_per_unit: Some(ft_per_unit),
                scale_source,
                notes,
            }
        } else {
            let mut notes = notes;
            notes.push(format!("rejected non-positive scale factor {ft_per_unit}"));
            Self::unknown(notes)
        }
    }

    /// An unresolved calibration.
    pub fn unknown(notes: Vec<String>) -> Self {
        Self {
            ft_per_unit: None,
            scale_source: ScaleSource::Unknown,
            notes,
        }
    }

    /// Real-world feet per page unit, when resolved.
    pub fn ft_per_unit(&self) -> Option<f64> {
        self.ft_per_unit
    }

    pub fn scale_source(&self) -> ScaleSource {
        self.scale_source
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_resolved(&self) -> bool {
        self.ft_per_unit.is_some()
    }
}

/// Serialized form of [`CalibrationResult`], validated on the way in.
#[derive(Deserialize)]
struct CalibrationRepr {
    #[serde(default)]
    ft_per_unit: Option<f64>,
    #[serde(default)]
    scale_source: ScaleSource,
    #[serde(default)]
    notes: Vec<String>,
}

impl From<CalibrationRepr> for CalibrationResult {
    fn from(repr: CalibrationRepr) -> Self {
        match (repr.ft_per_unit, repr.scale_source) {
            (Some(ft_per_unit), source) if source != ScaleSource::Unknown => {
                Self::resolved(ft_per_unit, source, repr.notes)
            }
            _ => Self::unknown(repr.notes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_keeps_factor() {
        let result = CalibrationResult::resolved(0.5, ScaleSource::ScaleBar, vec![]);
        assert_eq!(result.ft_per_unit(), Some(0.5));
        assert_eq!(result.scale_source(), ScaleSource::ScaleBar);
        assert!(result.is_resolved());
    }

    #[test]
    fn test_non_positive_factor_degrades_to_unknown() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = CalibrationResult::resolved(bad, ScaleSource::ScaleBar, vec![]);
            assert_eq!(result.ft_per_unit(), None);
            assert_eq!(result.scale_source(), ScaleSource::Unknown);
            assert_eq!(result.notes().len(), 1);
        }
    }

    #[test]
    fn test_deserialize_keeps_invariant() {
        let result: CalibrationResult = serde_json::from_str(
            r#"{"ft_per_unit": -2.0, "scale_source": "scale_bar", "notes": []}"#,
        )
        .unwrap();
        assert_eq!(result.ft_per_unit(), None);
        assert_eq!(result.scale_source(), ScaleSource::Unknown);

        let result: CalibrationResult = serde_json::from_str(
            r#"{"ft_per_unit": 2.0, "scale_source": "unknown", "notes": []}"#,
        )
        .unwrap();
        assert_eq!(result.ft_per_unit(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let result = CalibrationResult::resolved(0.25, ScaleSource::Manual, vec!["manual".into()]);
        let json = serde_json::to_string(&result).unwrap();
        let back: CalibrationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_scale_source_display() {
        assert_eq!(ScaleSource::ScaleBar.to_string(), "scale_bar");
        assert_eq!(
            serde_json::to_string(&ScaleSource::Dimension).unwrap(),
            "\"dimension\""
        );
    }
}
