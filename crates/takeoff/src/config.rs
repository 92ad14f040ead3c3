//! Configuration types for the takeoff pipeline.
//!
//! All types implement [`serde::Deserialize`] and default every field, so a
//! missing or partial TOML document yields the component defaults. A single
//! [`AppConfig`] is built per invocation and handed to each stage.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration grouping every section.
//! - [`PaletteConfig`] - Category reference colors and color tolerance.
//! - [`CalibrationConfig`] - Scale-bar search parameters.
//! - [`ClassifyConfig`] - Text proximity, ambiguity and legend settings.
//! - [`MergeConfig`] - Vertex snapping.
//! - [`MeasureConfig`] - Curb detection and trench defaults.
//! - [`NetworkConfig`] - Node snapping and label lookup.
//! - [`EarthworkConfig`] - Schedule search region.
//!
//! # Example
//!
//! ```
//! # use takeoff::config::AppConfig;
//! let config = AppConfig::from_toml(
//!     r##"
//!     [palette]
//!     tolerance = 40.0
//!     [palette.colors]
//!     water = "#0000ff"
//!     "##,
//! )
//! .unwrap();
//! assert_eq!(config.palette().tolerance, 40.0);
//! assert_eq!(config.calibration().min_bar_length, 120.0);
//! ```

use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;

use takeoff_core::{category::Category, color::Color};
use takeoff_parser::EarthworkOptions;

use crate::{TakeoffError, classify::Palette};

/// Top-level configuration combining every section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    palette: PaletteConfig,

    #[serde(default)]
    calibration: CalibrationConfig,

    #[serde(default)]
    classify: ClassifyConfig,

    #[serde(default)]
    merge: MergeConfig,

    #[serde(default)]
    measure: MeasureConfig,

    #[serde(default)]
    network: NetworkConfig,

    #[serde(default)]
    earthwork: EarthworkConfig,
}

impl AppConfig {
    /// Parses a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Config`] if the document is not valid TOML or a
    /// value has the wrong type.
    pub fn from_toml(source: &str) -> Result<Self, TakeoffError> {
        toml::from_str(source).map_err(|err| TakeoffError::Config(err.to_string()))
    }

    pub fn palette(&self) -> &PaletteConfig {
        &self.palette
    }

    pub fn calibration(&self) -> &CalibrationConfig {
        &self.calibration
    }

    pub fn classify(&self) -> &ClassifyConfig {
        &self.classify
    }

    pub fn merge(&self) -> &MergeConfig {
        &self.merge
    }

    pub fn measure(&self) -> &MeasureConfig {
        &self.measure
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn earthwork(&self) -> &EarthworkConfig {
        &self.earthwork
    }

    /// Replaces the calibration section, builder style.
    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// Replaces the palette section, builder style.
    pub fn with_palette(mut self, palette: PaletteConfig) -> Self {
        self.palette = palette;
        self
    }

    /// Replaces the classification section, builder style.
    pub fn with_classify(mut self, classify: ClassifyConfig) -> Self {
        self.classify = classify;
        self
    }

    /// Replaces the measurement section, builder style.
    pub fn with_measure(mut self, measure: MeasureConfig) -> Self {
        self.measure = measure;
        self
    }
}

/// Category reference colors.
///
/// Colors are CSS color strings. Entries that fail to parse are skipped with
/// a warning when the [`Palette`] is built.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Maximum RGB distance (0-255 scale) for a color match.
    pub tolerance: f64,
    /// Category name to color string.
    pub colors: IndexMap<String, String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        let colors = [
            ("water", "#0000ff"),
            ("sewer", "#008000"),
            ("storm", "#00c0c0"),
            ("gas", "#ffcc00"),
            ("electric", "#ff0000"),
            ("telecom", "#ff8000"),
            ("building", "#606060"),
            ("pavement", "#a0a0a0"),
            ("sidewalk", "#f5deb3"),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color.to_string()))
        .collect();
        Self {
            tolerance: 60.0,
            colors,
        }
    }
}

impl PaletteConfig {
    /// Builds the [`Palette`] used for color matching.
    pub fn palette(&self) -> Palette {
        let entries = self
            .colors
            .iter()
            .filter_map(|(name, value)| match Color::new(value) {
                Ok(color) => Some((Category::from(name.clone()), color)),
                Err(err) => {
                    warn!(
                        category = name.as_str(),
                        err = err.as_str();
                        "Skipping invalid palette color"
                    );
                    None
                }
            })
            .collect();
        Palette::new(entries, self.tolerance)
    }
}

/// Scale-bar search parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Maximum RGB distance from black for a near-black stroke.
    pub near_black_threshold: f64,
    /// Minimum stroke width of a scale-bar candidate.
    pub min_bar_width: f64,
    /// Shortest accepted scale bar, in page units.
    pub min_bar_length: f64,
    /// Longest accepted scale bar, in page units.
    pub max_bar_length: f64,
    /// Maximum |dy| of a horizontal bar, in page units.
    pub horizontal_tolerance: f64,
    /// How many texts nearest the scale anchor are searched for a length label.
    pub label_neighbors: usize,
    /// Nominal bar length in feet when no label is found.
    pub default_nominal_ft: f64,
    /// Resolve `1" = N'` notes when no scale bar is found.
    pub dimension_fallback: bool,
    /// Page units per paper inch, for scale notes.
    pub units_per_inch: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            near_black_threshold: 50.0,
            min_bar_width: 1.0,
            min_bar_length: 120.0,
            max_bar_length: 600.0,
            horizontal_tolerance: 1.0,
            label_neighbors: 12,
            default_nominal_ft: 100.0,
            dimension_fallback: false,
            units_per_inch: takeoff_parser::scale::UNITS_PER_INCH,
        }
    }
}

/// One keyword rule: any listed word near a line suggests `category`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordRuleConfig {
    pub category: String,
    pub keywords: Vec<String>,
}

/// Classification parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Radius around a feature midpoint searched for label text.
    pub text_radius: f64,
    /// Two palette matches closer than this are ambiguous.
    pub ambiguity_margin: f64,
    /// Replacement keyword rules, in priority order. Empty keeps the built-in list.
    pub keyword_rules: Vec<KeywordRuleConfig>,
    /// Radius around a legend swatch searched for its label.
    pub legend_label_radius: f64,
    /// Longest stroke accepted as a legend swatch.
    pub legend_max_swatch_length: f64,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            text_radius: 40.0,
            ambiguity_margin: 8.0,
            keyword_rules: Vec::new(),
            legend_label_radius: 80.0,
            legend_max_swatch_length: 120.0,
        }
    }
}

/// Vertex snapping for the line merge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Grid size vertices are rounded to, in page units.
    pub snap_tolerance: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 0.5,
        }
    }
}

/// Measurement parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Maximum RGB distance from black for a curb stroke.
    pub near_black_threshold: f64,
    /// Minimum stroke width of an explicit curb stroke.
    pub min_curb_width: f64,
    /// Diameter assumed for trench volume when unknown.
    pub default_diameter_in: f64,
    /// Cover depth assumed for trench volume when unknown.
    pub default_cover_ft: f64,
    /// Scale-bar lookalikes are excluded from curb when their length in feet
    /// falls within `[scale_bar_min_ft, scale_bar_max_ft]`.
    pub scale_bar_min_ft: f64,
    pub scale_bar_max_ft: f64,
    /// Fraction of the content height that counts as the lower page region.
    pub lower_region_fraction: f64,
    /// Maximum |dy| of a near-horizontal segment, in page units.
    pub horizontal_tolerance: f64,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            near_black_threshold: 50.0,
            min_curb_width: 1.5,
            default_diameter_in: 8.0,
            default_cover_ft: 4.0,
            scale_bar_min_ft: 50.0,
            scale_bar_max_ft: 150.0,
            lower_region_fraction: 0.25,
            horizontal_tolerance: 1.0,
        }
    }
}

/// Network assembly parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Endpoints closer than this share a node, in page units.
    pub node_snap_tolerance: f64,
    /// Radius around a node searched for structure labels.
    pub label_radius: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            node_snap_tolerance: 2.0,
            label_radius: 30.0,
        }
    }
}

/// Earthwork schedule search region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EarthworkConfig {
    pub region_width: f64,
    pub region_height: f64,
    pub left_margin: f64,
    pub row_tolerance: f64,
}

impl Default for EarthworkConfig {
    fn default() -> Self {
        let options = EarthworkOptions::default();
        Self {
            region_width: options.region_width,
            region_height: options.region_height,
            left_margin: options.left_margin,
            row_tolerance: options.row_tolerance,
        }
    }
}

impl EarthworkConfig {
    /// Returns the parser options for this section.
    pub fn options(&self) -> EarthworkOptions {
        EarthworkOptions {
            region_width: self.region_width,
            region_height: self.region_height,
            left_margin: self.left_margin,
            row_tolerance: self.row_tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.calibration(), &CalibrationConfig::default());
        assert_eq!(config.merge().snap_tolerance, 0.5);
        assert_eq!(config.measure().default_cover_ft, 4.0);
        assert_eq!(config.palette().tolerance, 60.0);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [calibration]
            min_bar_length = 50.0
            dimension_fallback = true
            "#,
        )
        .unwrap();
        assert_eq!(config.calibration().min_bar_length, 50.0);
        assert_eq!(config.calibration().max_bar_length, 600.0);
        assert!(config.calibration().dimension_fallback);
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let err = AppConfig::from_toml("[calibration]\nmin_bar_length = \"long\"").unwrap_err();
        assert!(matches!(err, TakeoffError::Config(_)));
    }

    #[test]
    fn test_default_palette_is_distinct_and_not_black() {
        let palette = PaletteConfig::default().palette();
        let entries = palette.entries();
        assert_eq!(entries.len(), 9);
        for (i, (_, a)) in entries.iter().enumerate() {
            assert!(!a.is_near_black(50.0));
            for (_, b) in &entries[i + 1..] {
                assert!(a.distance(b) > palette.tolerance());
            }
        }
    }

    #[test]
    fn test_invalid_palette_color_is_skipped() {
        let mut config = PaletteConfig::default();
        config.colors.insert("gas".to_string(), "not-a-color".to_string());
        let palette = config.palette();
        assert_eq!(palette.entries().len(), 8);
        assert!(palette.entries().iter().all(|(c, _)| *c != Category::Gas));
    }

    #[test]
    fn test_keyword_rules_from_toml() {
        let config = AppConfig::from_toml(
            r#"
            [[classify.keyword_rules]]
            category = "storm"
            keywords = ["RCP", "CB"]
            "#,
        )
        .unwrap();
        assert_eq!(config.classify().keyword_rules.len(), 1);
        assert_eq!(config.classify().keyword_rules[0].keywords, vec!["RCP", "CB"]);
    }
}
