//! Legend-derived classification rules.
//!
//! A legend maps drawn swatches to category names. Rules read from legend
//! pages take precedence over palette matching because they describe the
//! conventions of the drawing set at hand.

use log::{debug, trace};

use takeoff_core::{
    category::Category,
    color::Color,
    element::{ElementKind, PageSnapshot, TextElement, VectorElement},
};

use super::rules::{KeywordRule, first_match};

/// Which paint of an element a legend rule describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendTarget {
    Stroke,
    Fill,
}

/// A color (and for strokes, a width window) that means one category.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendRule {
    pub category: Category,
    pub target: LegendTarget,
    pub color: Color,
    pub min_width: Option<f64>,
    pub max_width: Option<f64>,
}

impl LegendRule {
    /// A stroke rule without a width window.
    pub fn stroke(category: Category, color: Color) -> Self {
        Self {
            category,
            target: LegendTarget::Stroke,
            color,
            min_width: None,
            max_width: None,
        }
    }

    /// A fill rule.
    pub fn fill(category: Category, color: Color) -> Self {
        Self {
            category,
            target: LegendTarget::Fill,
            color,
            min_width: None,
            max_width: None,
        }
    }

    /// Restricts a stroke rule to widths in `[min, max]`, builder style.
    pub fn with_width_range(mut self, min: f64, max: f64) -> Self {
        self.min_width = Some(min);
        self.max_width = Some(max);
        self
    }

    /// Returns true if `element` is painted the way this rule describes.
    pub fn matches(&self, element: &VectorElement, tolerance: f64) -> bool {
        let paint = match self.target {
            LegendTarget::Stroke => element.stroke,
            LegendTarget::Fill => element.fill,
        };
        let Some(paint) = paint else {
            return false;
        };
        if paint.distance(&self.color) > tolerance {
            return false;
        }
        if self.target == LegendTarget::Fill {
            return true;
        }
        self.min_width.is_none_or(|min| element.width >= min)
            && self.max_width.is_none_or(|max| element.width <= max)
    }
}

/// Source of legend rules for a drawing set.
pub trait LegendRuleProvider {
    /// Derives rules from the designated legend pages.
    ///
    /// Returns an empty list when no legend can be read.
    fn legend_rules(&self, legend_pages: &[PageSnapshot]) -> Vec<LegendRule>;
}

/// Reads legends drawn as short sample strokes or small filled swatches,
/// each labeled by a nearby text.
#[derive(Debug, Clone)]
pub struct SwatchLegendProvider {
    keyword_rules: Vec<KeywordRule>,
    label_radius: f64,
    max_swatch_length: f64,
}

impl SwatchLegendProvider {
    pub fn new(
        keyword_rules: Vec<KeywordRule>,
        label_radius: f64,
        max_swatch_length: f64,
    ) -> Self {
        Self {
            keyword_rules,
            label_radius,
            max_swatch_length,
        }
    }

    fn nearest_label<'a>(
        &self,
        element: &VectorElement,
        texts: &'a [TextElement],
    ) -> Option<&'a TextElement> {
        let anchor = element.bounds()?.center();
        let limit = self.label_radius * self.label_radius;
        texts
            .iter()
            .map(|text| (text, text.center().distance_squared(anchor)))
            .filter(|(_, d2)| *d2 <= limit)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(text, _)| text)
    }

    fn rule_for(&self, element: &VectorElement, texts: &[TextElement]) -> Option<LegendRule> {
        let bounds = element.bounds()?;
        let is_swatch = bounds.width().max(bounds.height()) <= self.max_swatch_length;
        if !is_swatch {
            return None;
        }

        let label = self.nearest_label(element, texts)?;
        let category = first_match(&self.keyword_rules, [label.text.as_str()])?.clone();
        trace!(category:% = category, label = label.text.as_str(); "Legend swatch labeled");

        match (element.kind, element.fill, element.stroke) {
            (ElementKind::Polygon, Some(fill), _) => Some(LegendRule::fill(category, fill)),
            (_, _, Some(stroke)) if element.length() > 0.0 => {
                let rule = LegendRule::stroke(category, stroke);
                if element.width > 0.0 {
                    Some(rule.with_width_range(element.width * 0.5, element.width * 1.5))
                } else {
                    Some(rule)
                }
            }
            _ => None,
        }
    }
}

impl LegendRuleProvider for SwatchLegendProvider {
    fn legend_rules(&self, legend_pages: &[PageSnapshot]) -> Vec<LegendRule> {
        let mut rules: Vec<LegendRule> = Vec::new();
        for page in legend_pages {
            for element in &page.vectors {
                let Some(rule) = self.rule_for(element, &page.texts) else {
                    continue;
                };
                if !rules.contains(&rule) {
                    rules.push(rule);
                }
            }
        }
        debug!(rules = rules.len(); "Legend rules derived");
        rules
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::geometry::Point;

    use super::*;
    use crate::classify::rules::{default_keyword_rules, legend_keyword_rules};

    fn provider() -> SwatchLegendProvider {
        SwatchLegendProvider::new(legend_keyword_rules(&default_keyword_rules()), 80.0, 120.0)
    }

    #[test]
    fn test_stroke_rule_width_window() {
        let rule = LegendRule::stroke(Category::Water, Color::from_rgb8(0, 0, 255))
            .with_width_range(1.0, 3.0);
        let line = |width| {
            VectorElement::line(
                vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
                Color::from_rgb8(0, 0, 250),
                width,
            )
        };
        assert!(rule.matches(&line(2.0), 20.0));
        assert!(!rule.matches(&line(4.0), 20.0));
        assert!(!rule.matches(&line(2.0), 1.0));
    }

    #[test]
    fn test_fill_rule_ignores_stroke() {
        let rule = LegendRule::fill(Category::Pavement, Color::from_rgb8(160, 160, 160));
        let polygon = VectorElement::polygon(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)],
            Color::from_rgb8(160, 160, 160),
        );
        assert!(rule.matches(&polygon, 10.0));
        let line = VectorElement::line(polygon.points.clone(), Color::from_rgb8(160, 160, 160), 1.0);
        assert!(!rule.matches(&line, 10.0));
    }

    #[test]
    fn test_swatches_become_rules() {
        let page = PageSnapshot::new(
            vec![
                VectorElement::line(
                    vec![Point::new(0.0, 100.0), Point::new(40.0, 100.0)],
                    Color::from_rgb8(200, 0, 200),
                    2.0,
                ),
                VectorElement::polygon(
                    vec![
                        Point::new(200.0, 50.0),
                        Point::new(220.0, 50.0),
                        Point::new(220.0, 60.0),
                        Point::new(200.0, 60.0),
                    ],
                    Color::from_rgb8(90, 90, 90),
                ),
                VectorElement::line(
                    vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)],
                    Color::from_rgb8(0, 0, 0),
                    1.0,
                ),
            ],
            vec![
                TextElement::at("SANITARY SEWER", Point::new(90.0, 100.0)),
                TextElement::at("BUILDING", Point::new(250.0, 55.0)),
            ],
        );

        let rules = provider().legend_rules(&[page]);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].category, Category::Sewer);
        assert_eq!(rules[0].target, LegendTarget::Stroke);
        assert_eq!(rules[0].min_width, Some(1.0));
        assert_eq!(rules[0].max_width, Some(3.0));
        assert_eq!(rules[1].category, Category::Building);
        assert_eq!(rules[1].target, LegendTarget::Fill);
    }

    #[test]
    fn test_unlabeled_swatch_is_ignored() {
        let page = PageSnapshot::new(
            vec![VectorElement::line(
                vec![Point::new(0.0, 100.0), Point::new(40.0, 100.0)],
                Color::from_rgb8(200, 0, 200),
                2.0,
            )],
            vec![TextElement::at("SEWER", Point::new(400.0, 400.0))],
        );
        assert!(provider().legend_rules(&[page]).is_empty());
        assert!(provider().legend_rules(&[]).is_empty());
    }
}
