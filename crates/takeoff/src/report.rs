//! Structured pipeline outputs.
//!
//! Everything here is plain data: a caller can serialize a
//! [`TakeoffReport`] as-is or pick the parts it needs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use takeoff_core::{
    calibration::CalibrationResult,
    category::Category,
    color::Color,
    earthwork::EarthworkTable,
    geometry::{Bounds, Point},
    network::Network,
    qa::QaViolation,
    quantity::Quantities,
};

use crate::{
    classify::{Classification, Palette},
    network::NetworkSummary,
    qa::QaSummary,
};

/// Display geometry of one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayLayer {
    /// Palette color of the category, when it has one.
    pub color: Option<Color>,
    pub lines: Vec<Vec<Point>>,
    pub rings: Vec<Vec<Point>>,
}

impl OverlayLayer {
    fn points(&self) -> impl Iterator<Item = &Point> {
        self.lines.iter().chain(&self.rings).flatten()
    }
}

/// Per-category display geometry, in page space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub layers: IndexMap<Category, OverlayLayer>,
}

impl Overlay {
    /// Collects merged lines and rings, colored from `palette`.
    pub fn from_classification(classification: &Classification, palette: &Palette) -> Self {
        let mut layers: IndexMap<Category, OverlayLayer> = IndexMap::new();
        for (category, features) in &classification.lines {
            let layer = layers.entry(category.clone()).or_default();
            layer.lines.extend(features.iter().map(|f| f.points.clone()));
        }
        for (category, features) in &classification.areas {
            let layer = layers.entry(category.clone()).or_default();
            layer.rings.extend(features.iter().map(|f| f.points.clone()));
        }
        for (category, layer) in layers.iter_mut() {
            layer.color = palette.color_of(category);
        }
        Self { layers }
    }

    pub fn is_empty(&self) -> bool {
        self.layers
            .values()
            .all(|layer| layer.lines.is_empty() && layer.rings.is_empty())
    }

    /// Bounding box of every overlay point.
    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<Point> = self.layers.values().flat_map(OverlayLayer::points).copied().collect();
        Bounds::from_points(&points)
    }
}

/// What the run used and found, for troubleshooting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub ft_per_unit: Option<f64>,
    pub scale_source: String,
    pub color_tolerance: f64,
    pub snap_tolerance: f64,
    pub classified_lines: usize,
    pub classified_areas: usize,
    pub merged_lines: usize,
    pub legend_rules: usize,
    pub notes: Vec<String>,
}

/// The complete result of one takeoff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeoffReport {
    pub calibration: CalibrationResult,
    /// Absent when the scale could not be resolved.
    pub quantities: Option<Quantities>,
    pub overlay: Overlay,
    pub diagnostics: Diagnostics,
    pub networks: Vec<Network>,
    pub network_summaries: Vec<NetworkSummary>,
    pub earthwork_tables: Vec<EarthworkTable>,
    pub violations: Vec<QaViolation>,
    pub qa_summary: QaSummary,
}

impl TakeoffReport {
    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the serialization error, which only occurs for non-string map keys.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::feature::ClassifiedFeature;

    use super::*;

    #[test]
    fn test_overlay_from_classification() {
        let palette = Palette::new(vec![(Category::Water, Color::from_rgb8(0, 0, 255))], 60.0);
        let mut classification = Classification::default();
        classification.lines.insert(
            Category::Water,
            vec![ClassifiedFeature::new(
                Category::Water,
                vec![Point::new(0.0, 0.0), Point::new(10.0, 5.0)],
                1.0,
            )],
        );
        classification.areas.insert(
            Category::Building,
            vec![ClassifiedFeature::new(
                Category::Building,
                vec![Point::new(-5.0, 0.0), Point::new(0.0, 0.0), Point::new(0.0, 20.0)],
                1.0,
            )],
        );

        let overlay = Overlay::from_classification(&classification, &palette);
        assert!(!overlay.is_empty());
        assert_eq!(overlay.layers[&Category::Water].color, Some(Color::from_rgb8(0, 0, 255)));
        assert_eq!(overlay.layers[&Category::Building].color, None);
        assert_eq!(overlay.layers[&Category::Building].rings.len(), 1);
        assert_eq!(overlay.bounds(), Some(Bounds::new(-5.0, 0.0, 10.0, 20.0)));
    }

    #[test]
    fn test_empty_overlay() {
        let overlay = Overlay::default();
        assert!(overlay.is_empty());
        assert!(overlay.bounds().is_none());
    }
}
