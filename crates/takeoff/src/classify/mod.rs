//! Semantic classification of raw page geometry.
//!
//! A [`FeatureClassifier`] turns the vector elements of a page into
//! categorized polylines and filled rings. The default [`ColorClassifier`]
//! works in three layers, first match wins:
//!
//! 1. legend rules derived from the drawing set's legend pages;
//! 2. nearest palette color within tolerance;
//! 3. for lines whose color is absent, unmatched or ambiguous, keyword
//!    rules applied to the text near the line.
//!
//! Pipe diameter and material are read from nearby labels for every
//! classified line. Geometry that no layer can classify is dropped.

mod legend;
mod palette;
mod rules;

pub use legend::{LegendRule, LegendRuleProvider, LegendTarget, SwatchLegendProvider};
pub use palette::{Palette, PaletteMatch};
pub use rules::{KeywordRule, default_keyword_rules, first_match, legend_keyword_rules};

use indexmap::IndexMap;
use log::{debug, info, trace};

use takeoff_core::{
    category::Category,
    element::{ElementKind, PageSnapshot, VectorElement},
    feature::ClassifiedFeature,
    geometry::{Point, close_ring},
};
use takeoff_parser::label::{PipeLabel, parse_pipe_label};

use crate::config::ClassifyConfig;

/// Extra label text attached to individual elements, keyed by element index.
///
/// Hints come from outside the page (for example a profile sheet) and are
/// treated like text lying next to the element.
pub type ElementHints = IndexMap<usize, Vec<String>>;

/// Confidence of a legend rule match.
const LEGEND_CONFIDENCE: f64 = 0.95;
/// Confidence of a line resolved by nearby keywords.
const KEYWORD_CONFIDENCE: f64 = 0.6;
/// Confidence of an ambiguous color match no text could settle.
const AMBIGUOUS_CONFIDENCE: f64 = 0.4;

/// Categorized geometry of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Linear features per category, in element order.
    pub lines: IndexMap<Category, Vec<ClassifiedFeature>>,
    /// Closed rings per area category, in element order.
    pub areas: IndexMap<Category, Vec<ClassifiedFeature>>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.areas.is_empty()
    }

    /// Number of linear features.
    pub fn line_count(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    /// Number of area features.
    pub fn area_count(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }

    /// Rings of an area category.
    pub fn rings(&self, category: &Category) -> Vec<Vec<Point>> {
        self.areas
            .get(category)
            .map(|features| features.iter().map(|f| f.points.clone()).collect())
            .unwrap_or_default()
    }

    fn push_line(&mut self, feature: ClassifiedFeature) {
        self.lines
            .entry(feature.category.clone())
            .or_default()
            .push(feature);
    }

    fn push_area(&mut self, feature: ClassifiedFeature) {
        self.areas
            .entry(feature.category.clone())
            .or_default()
            .push(feature);
    }
}

/// A strategy that assigns categories to page geometry.
///
/// Implementations must be deterministic: the same inputs always produce
/// the same classification.
pub trait FeatureClassifier {
    fn classify(
        &self,
        page: &PageSnapshot,
        legend_rules: &[LegendRule],
        hints: &ElementHints,
    ) -> Classification;
}

/// Classifies by legend rules, palette color and nearby text keywords.
#[derive(Debug, Clone)]
pub struct ColorClassifier {
    palette: Palette,
    keyword_rules: Vec<KeywordRule>,
    text_radius: f64,
    ambiguity_margin: f64,
}

impl ColorClassifier {
    /// Creates a classifier from the palette and classification settings.
    ///
    /// Keyword rules from the configuration replace the built-in list when
    /// present.
    pub fn new(palette: Palette, config: &ClassifyConfig) -> Self {
        let keyword_rules = if config.keyword_rules.is_empty() {
            default_keyword_rules()
        } else {
            config.keyword_rules.iter().map(KeywordRule::from).collect()
        };
        Self {
            palette,
            keyword_rules,
            text_radius: config.text_radius,
            ambiguity_margin: config.ambiguity_margin,
        }
    }

    /// Replaces the keyword rule list, builder style.
    pub fn with_keyword_rules(mut self, rules: Vec<KeywordRule>) -> Self {
        self.keyword_rules = rules;
        self
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn keyword_rules(&self) -> &[KeywordRule] {
        &self.keyword_rules
    }

    /// Texts within the search radius of `anchor`, nearest first, followed
    /// by the element's hints.
    fn nearby_texts<'a>(
        &self,
        page: &'a PageSnapshot,
        anchor: Point,
        hints: Option<&'a Vec<String>>,
    ) -> Vec<&'a str> {
        let limit = self.text_radius * self.text_radius;
        let mut near: Vec<(&str, f64)> = page
            .texts
            .iter()
            .map(|t| (t.text.as_str(), t.center().distance_squared(anchor)))
            .filter(|(_, d2)| *d2 <= limit)
            .collect();
        near.sort_by(|a, b| a.1.total_cmp(&b.1));

        near.into_iter()
            .map(|(text, _)| text)
            .chain(hints.into_iter().flatten().map(String::as_str))
            .collect()
    }

    fn classify_line(
        &self,
        element: &VectorElement,
        points: Vec<Point>,
        legend_rules: &[LegendRule],
        texts: &[&str],
    ) -> Option<ClassifiedFeature> {
        let tolerance = self.palette.tolerance();

        let legend = legend_rules
            .iter()
            .filter(|rule| rule.target == LegendTarget::Stroke)
            .find(|rule| rule.matches(element, tolerance));
        let color = element
            .stroke
            .and_then(|stroke| self.palette.nearest(&stroke, |c| !c.is_area()));

        let (category, confidence) = match (legend, color) {
            (Some(rule), _) => (rule.category.clone(), LEGEND_CONFIDENCE),
            (None, Some(found)) if !found.is_ambiguous(self.ambiguity_margin) => {
                let confidence = 1.0 - 0.5 * found.distance / tolerance.max(f64::EPSILON);
                (found.category, confidence)
            }
            (None, found) => match first_match(&self.keyword_rules, texts.iter().copied()) {
                Some(category) => (category.clone(), KEYWORD_CONFIDENCE),
                None => (found?.category, AMBIGUOUS_CONFIDENCE),
            },
        };

        let mut label = PipeLabel::default();
        for text in texts {
            label.merge(parse_pipe_label(text));
        }

        let mut feature = ClassifiedFeature::new(category, points, confidence);
        feature.diameter_in = label.diameter_in;
        feature.material = label.material;
        Some(feature)
    }

    fn classify_fill(
        &self,
        element: &VectorElement,
        points: &[Point],
        legend_rules: &[LegendRule],
    ) -> Option<ClassifiedFeature> {
        let tolerance = self.palette.tolerance();
        if let Some(rule) = legend_rules
            .iter()
            .filter(|rule| rule.target == LegendTarget::Fill)
            .find(|rule| rule.matches(element, tolerance))
        {
            return Some(ClassifiedFeature::new(
                rule.category.clone(),
                close_ring(points),
                LEGEND_CONFIDENCE,
            ));
        }

        let found = self.palette.nearest(&element.fill?, Category::is_area)?;
        let confidence = 1.0 - 0.5 * found.distance / tolerance.max(f64::EPSILON);
        Some(ClassifiedFeature::new(found.category, close_ring(points), confidence))
    }
}

impl FeatureClassifier for ColorClassifier {
    fn classify(
        &self,
        page: &PageSnapshot,
        legend_rules: &[LegendRule],
        hints: &ElementHints,
    ) -> Classification {
        let mut classification = Classification::default();
        let mut dropped = 0usize;

        for (idx, element) in page.vectors.iter().enumerate() {
            let points = element.page_points().into_owned();
            if points.len() < 2 {
                dropped += 1;
                continue;
            }

            let is_filled_polygon = element.kind == ElementKind::Polygon && element.fill.is_some();
            if is_filled_polygon {
                match self.classify_fill(element, &points, legend_rules) {
                    Some(feature) => classification.push_area(feature),
                    None => dropped += 1,
                }
                continue;
            }

            let line_points = if element.kind == ElementKind::Polygon {
                close_ring(&points)
            } else {
                points
            };
            let Some(anchor) = element.midpoint() else {
                dropped += 1;
                continue;
            };
            let texts = self.nearby_texts(page, anchor, hints.get(&idx));
            match self.classify_line(element, line_points, legend_rules, &texts) {
                Some(feature) => {
                    trace!(
                        element = idx,
                        category:% = feature.category,
                        confidence = feature.confidence;
                        "Classified line"
                    );
                    classification.push_line(feature);
                }
                None => dropped += 1,
            }
        }

        debug!(dropped; "Unclassified elements dropped");
        info!(
            lines = classification.line_count(),
            areas = classification.area_count();
            "Classification finished"
        );
        classification
    }
}
