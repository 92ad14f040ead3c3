//! Scale calibration.
//!
//! The [`ScaleCalibrator`] resolves how many real-world feet one page unit
//! represents. Detection follows the way scale bars are drawn on civil sheets:
//!
//! 1. The lowest, then left-most text mentioning "scale" is the anchor.
//! 2. The texts nearest the anchor are searched for a `<number> ft` label,
//!    which gives the nominal bar length (100 ft when no label is found).
//! 3. Near-black, wide enough, near-horizontal lines within the configured
//!    length window are scale-bar candidates.
//! 4. Candidates are ranked by distance to the anchor, then by whether they
//!    sit in the legend region (bottom-left quadrant of all lines), then by
//!    length, longest first.
//!
//! An unresolved scale is not an error: the result carries
//! [`ScaleSource::Unknown`] and no factor, and the caller decides whether to
//! ask for a manual value.

use std::cmp::Ordering;

use log::{debug, info, trace};

use takeoff_core::{
    calibration::{CalibrationResult, ScaleSource},
    element::{ElementKind, PageSnapshot, TextElement, VectorElement},
    geometry::Point,
};
use takeoff_parser::scale::{mentions_scale, parse_feet_label, parse_ratio_note};

use crate::{config::CalibrationConfig, error::TakeoffError};

/// A scale-bar candidate with its ranking inputs.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    length: f64,
    anchor_distance: f64,
    outside_legend: bool,
}

impl Candidate {
    fn rank(&self, other: &Self) -> Ordering {
        self.anchor_distance
            .total_cmp(&other.anchor_distance)
            .then(self.outside_legend.cmp(&other.outside_legend))
            .then(other.length.total_cmp(&self.length))
    }
}

/// Resolves `ft_per_unit` for a page.
#[derive(Debug, Clone)]
pub struct ScaleCalibrator<'a> {
    config: &'a CalibrationConfig,
}

impl<'a> ScaleCalibrator<'a> {
    pub fn new(config: &'a CalibrationConfig) -> Self {
        Self { config }
    }

    /// Calibrates a page, honoring a manual override when given.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::InvalidManualScale`] when `manual_ft_per_unit`
    /// is zero, negative or not finite. Detection itself never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// # use takeoff::{calibrate::ScaleCalibrator, config::CalibrationConfig};
    /// # use takeoff_core::{calibration::ScaleSource, element::PageSnapshot};
    /// let config = CalibrationConfig::default();
    /// let calibrator = ScaleCalibrator::new(&config);
    ///
    /// let result = calibrator.calibrate(&PageSnapshot::default(), Some(2.5)).unwrap();
    /// assert_eq!(result.ft_per_unit(), Some(2.5));
    /// assert_eq!(result.scale_source(), ScaleSource::Manual);
    ///
    /// let result = calibrator.calibrate(&PageSnapshot::default(), None).unwrap();
    /// assert_eq!(result.scale_source(), ScaleSource::Unknown);
    ///
    /// assert!(calibrator.calibrate(&PageSnapshot::default(), Some(0.0)).is_err());
    /// ```
    pub fn calibrate(
        &self,
        page: &PageSnapshot,
        manual_ft_per_unit: Option<f64>,
    ) -> Result<CalibrationResult, TakeoffError> {
        if let Some(manual) = manual_ft_per_unit {
            if !(manual.is_finite() && manual > 0.0) {
                return Err(TakeoffError::InvalidManualScale(manual));
            }
            info!(ft_per_unit = manual; "Using manual scale");
            return Ok(CalibrationResult::resolved(
                manual,
                ScaleSource::Manual,
                vec![format!("manual scale {manual} ft per unit")],
            ));
        }

        let result = self.detect(page);
        info!(
            scale_source:% = result.scale_source(),
            ft_per_unit:? = result.ft_per_unit();
            "Calibration finished"
        );
        Ok(result)
    }

    fn detect(&self, page: &PageSnapshot) -> CalibrationResult {
        let mut notes = Vec::new();

        let anchor = scale_anchor(&page.texts);
        match anchor {
            Some(text) => notes.push(format!("scale anchor \"{}\"", text.text)),
            None => notes.push("no scale text found".to_string()),
        }

        let nominal_ft = match anchor.and_then(|a| self.nominal_length(&page.texts, a)) {
            Some(feet) => {
                notes.push(format!("nominal bar length {feet} ft from label"));
                feet
            }
            None => {
                notes.push(format!(
                    "no length label near scale text; assuming {} ft",
                    self.config.default_nominal_ft
                ));
                self.config.default_nominal_ft
            }
        };

        let lines: Vec<&VectorElement> = page
            .vectors
            .iter()
            .filter(|e| e.kind == ElementKind::Line)
            .collect();
        let legend_region = lines
            .iter()
            .filter_map(|e| e.bounds())
            .reduce(|acc, b| acc.merge(&b))
            .map(|b| b.bottom_left_quadrant());

        let anchor_center = anchor.map(TextElement::center);
        let mut candidates: Vec<Candidate> = lines
            .iter()
            .filter(|e| self.is_candidate(e))
            .filter_map(|e| {
                let midpoint = e.midpoint()?;
                Some(Candidate {
                    length: e.length(),
                    anchor_distance: anchor_center.map_or(0.0, |a| a.distance_squared(midpoint)),
                    outside_legend: !legend_region.is_some_and(|r| r.contains(midpoint)),
                })
            })
            .collect();
        candidates.sort_by(Candidate::rank);
        debug!(candidates_count = candidates.len(); "Scale bar candidates ranked");

        if let Some(best) = candidates.first() {
            notes.push(format!(
                "scale bar {:.1} units selected from {} candidate(s)",
                best.length,
                candidates.len()
            ));
            return CalibrationResult::resolved(nominal_ft / best.length, ScaleSource::ScaleBar, notes);
        }
        notes.push("no scale bar candidate found".to_string());

        if self.config.dimension_fallback {
            if let Some(feet_per_inch) = page.texts.iter().find_map(|t| parse_ratio_note(&t.text)) {
                notes.push(format!("scale note 1\" = {feet_per_inch}'"));
                return CalibrationResult::resolved(
                    feet_per_inch / self.config.units_per_inch,
                    ScaleSource::Dimension,
                    notes,
                );
            }
        }

        CalibrationResult::unknown(notes)
    }

    /// First `<number> ft` label among the texts nearest the anchor.
    fn nominal_length(&self, texts: &[TextElement], anchor: &TextElement) -> Option<f64> {
        let center = anchor.center();
        let mut nearest: Vec<(f64, &TextElement)> = texts
            .iter()
            .map(|t| (t.center().distance_squared(center), t))
            .collect();
        nearest.sort_by(|a, b| a.0.total_cmp(&b.0));
        nearest
            .into_iter()
            .take(self.config.label_neighbors)
            .find_map(|(_, t)| parse_feet_label(&t.text))
    }

    fn is_candidate(&self, element: &VectorElement) -> bool {
        let near_black = element
            .stroke
            .is_some_and(|c| c.is_near_black(self.config.near_black_threshold));
        if !near_black || element.width < self.config.min_bar_width {
            return false;
        }
        let Some(bounds) = element.bounds() else {
            return false;
        };
        let length = element.length();
        let accepted = bounds.height() <= self.config.horizontal_tolerance
            && (self.config.min_bar_length..=self.config.max_bar_length).contains(&length);
        trace!(length, accepted; "Scale bar candidate checked");
        accepted
    }
}

/// The lowest, then left-most text mentioning "scale".
fn scale_anchor(texts: &[TextElement]) -> Option<&TextElement> {
    texts
        .iter()
        .filter(|t| mentions_scale(&t.text))
        .min_by(|a, b| {
            let (a, b): (Point, Point) = (a.center(), b.center());
            a.y().total_cmp(&b.y()).then(a.x().total_cmp(&b.x()))
        })
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use takeoff_core::color::Color;

    use super::*;

    fn line(x1: f64, y1: f64, x2: f64, y2: f64, color: Color, width: f64) -> VectorElement {
        VectorElement::line(vec![Point::new(x1, y1), Point::new(x2, y2)], color, width)
    }

    fn black() -> Color {
        Color::from_rgb8(0, 0, 0)
    }

    fn scale_bar_page() -> PageSnapshot {
        PageSnapshot::new(
            vec![
                line(50.0, 50.0, 150.0, 50.0, black(), 3.0),
                line(0.0, 800.0, 1000.0, 800.0, Color::from_rgb8(0, 0, 255), 1.0),
            ],
            vec![
                TextElement::at("GRAPHIC SCALE", Point::new(100.0, 30.0)),
                TextElement::at("100 ft", Point::new(150.0, 60.0)),
            ],
        )
    }

    #[test]
    fn test_scale_bar_resolves_factor() {
        let config = CalibrationConfig {
            min_bar_length: 50.0,
            ..CalibrationConfig::default()
        };
        let result = ScaleCalibrator::new(&config)
            .calibrate(&scale_bar_page(), None)
            .unwrap();
        assert_eq!(result.scale_source(), ScaleSource::ScaleBar);
        assert!(approx_eq!(f64, result.ft_per_unit().unwrap(), 1.0));
    }

    #[test]
    fn test_default_window_rejects_short_bar() {
        let config = CalibrationConfig::default();
        let result = ScaleCalibrator::new(&config)
            .calibrate(&scale_bar_page(), None)
            .unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Unknown);
        assert!(result.ft_per_unit().is_none());
        assert!(!result.notes().is_empty());
    }

    #[test]
    fn test_invalid_manual_scale_is_fatal() {
        let config = CalibrationConfig::default();
        let calibrator = ScaleCalibrator::new(&config);
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = calibrator.calibrate(&scale_bar_page(), Some(value)).unwrap_err();
            assert!(matches!(err, TakeoffError::InvalidManualScale(_)));
        }
    }

    #[test]
    fn test_manual_scale_short_circuits_detection() {
        let config = CalibrationConfig {
            min_bar_length: 50.0,
            ..CalibrationConfig::default()
        };
        let result = ScaleCalibrator::new(&config)
            .calibrate(&scale_bar_page(), Some(0.25))
            .unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Manual);
        assert_eq!(result.ft_per_unit(), Some(0.25));
    }

    #[test]
    fn test_missing_label_defaults_to_100_ft() {
        let config = CalibrationConfig::default();
        let page = PageSnapshot::new(
            vec![line(0.0, 0.0, 200.0, 0.0, black(), 2.0)],
            vec![TextElement::at("SCALE", Point::new(100.0, -20.0))],
        );
        let result = ScaleCalibrator::new(&config).calibrate(&page, None).unwrap();
        assert_eq!(result.ft_per_unit(), Some(0.5));
    }

    #[test]
    fn test_candidate_nearest_anchor_wins() {
        let config = CalibrationConfig::default();
        let page = PageSnapshot::new(
            vec![
                line(0.0, 0.0, 400.0, 0.0, black(), 2.0),
                line(600.0, 500.0, 800.0, 500.0, black(), 2.0),
            ],
            vec![
                TextElement::at("SCALE", Point::new(700.0, 480.0)),
                TextElement::at("0 ft", Point::new(600.0, 510.0)),
                TextElement::at("50 ft", Point::new(800.0, 510.0)),
            ],
        );
        let result = ScaleCalibrator::new(&config).calibrate(&page, None).unwrap();
        assert!(approx_eq!(f64, result.ft_per_unit().unwrap(), 0.25));
    }

    #[test]
    fn test_rejects_colored_thin_and_sloped_lines() {
        let config = CalibrationConfig::default();
        let page = PageSnapshot::new(
            vec![
                line(0.0, 0.0, 200.0, 0.0, Color::from_rgb8(255, 0, 0), 3.0),
                line(0.0, 10.0, 200.0, 10.0, black(), 0.5),
                line(0.0, 20.0, 200.0, 40.0, black(), 3.0),
            ],
            vec![TextElement::at("SCALE 100 ft", Point::new(100.0, -10.0))],
        );
        let result = ScaleCalibrator::new(&config).calibrate(&page, None).unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Unknown);
    }

    #[test]
    fn test_empty_page_is_unknown() {
        let config = CalibrationConfig::default();
        let result = ScaleCalibrator::new(&config)
            .calibrate(&PageSnapshot::default(), None)
            .unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Unknown);
        assert!(result.ft_per_unit().is_none());
    }

    #[test]
    fn test_dimension_fallback_is_opt_in() {
        let page = PageSnapshot::new(
            vec![],
            vec![TextElement::at("SCALE: 1\" = 40'", Point::new(100.0, 20.0))],
        );

        let config = CalibrationConfig::default();
        let result = ScaleCalibrator::new(&config).calibrate(&page, None).unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Unknown);

        let config = CalibrationConfig {
            dimension_fallback: true,
            ..CalibrationConfig::default()
        };
        let result = ScaleCalibrator::new(&config).calibrate(&page, None).unwrap();
        assert_eq!(result.scale_source(), ScaleSource::Dimension);
        assert!(approx_eq!(f64, result.ft_per_unit().unwrap(), 40.0 / 72.0));
    }
}
