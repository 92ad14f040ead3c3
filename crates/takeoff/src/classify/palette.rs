//! Nearest-color matching against the category palette.

use takeoff_core::{category::Category, color::Color};

/// Category reference colors with a shared match tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<(Category, Color)>,
    tolerance: f64,
}

/// Result of a palette lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteMatch {
    pub category: Category,
    pub distance: f64,
    /// Distance of the second-nearest entry, when it is also within tolerance.
    pub runner_up: Option<(Category, f64)>,
}

impl PaletteMatch {
    /// True when the runner-up is within `margin` of the best match.
    pub fn is_ambiguous(&self, margin: f64) -> bool {
        self.runner_up
            .as_ref()
            .is_some_and(|(_, distance)| distance - self.distance < margin)
    }
}

impl Palette {
    pub fn new(entries: Vec<(Category, Color)>, tolerance: f64) -> Self {
        Self { entries, tolerance }
    }

    pub fn entries(&self) -> &[(Category, Color)] {
        &self.entries
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Reference color of `category`, if it has one.
    pub fn color_of(&self, category: &Category) -> Option<Color> {
        self.entries
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, color)| *color)
    }

    /// Finds the nearest entry accepted by `filter` within tolerance.
    ///
    /// Ties keep the earlier palette entry.
    pub fn nearest(&self, color: &Color, filter: impl Fn(&Category) -> bool) -> Option<PaletteMatch> {
        let mut ranked: Vec<(&Category, f64)> = self
            .entries
            .iter()
            .filter(|(category, _)| filter(category))
            .map(|(category, reference)| (category, color.distance(reference)))
            .filter(|(_, distance)| *distance <= self.tolerance)
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut ranked = ranked.into_iter();
        let (category, distance) = ranked.next()?;
        Some(PaletteMatch {
            category: category.clone(),
            distance,
            runner_up: ranked.next().map(|(c, d)| (c.clone(), d)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn palette() -> Palette {
        Palette::new(
            vec![
                (Category::Water, Color::from_rgb8(0, 0, 255)),
                (Category::Sewer, Color::from_rgb8(0, 128, 0)),
                (Category::Storm, Color::from_rgb8(0, 140, 0)),
                (Category::Building, Color::from_rgb8(96, 96, 96)),
            ],
            60.0,
        )
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let found = palette()
            .nearest(&Color::from_rgb8(10, 10, 240), |_| true)
            .unwrap();
        assert_eq!(found.category, Category::Water);
        assert!(found.runner_up.is_none());
        assert!(!found.is_ambiguous(8.0));
    }

    #[test]
    fn test_nothing_within_tolerance() {
        assert!(palette().nearest(&Color::from_rgb8(255, 0, 0), |_| true).is_none());
    }

    #[test]
    fn test_filter_restricts_categories() {
        let found = palette().nearest(&Color::from_rgb8(96, 96, 96), |c| c.is_area());
        assert_eq!(found.unwrap().category, Category::Building);
        let found = palette().nearest(&Color::from_rgb8(96, 96, 96), |c| !c.is_area());
        assert!(found.is_none());
    }

    #[test]
    fn test_close_entries_are_ambiguous() {
        let found = palette()
            .nearest(&Color::from_rgb8(0, 134, 0), |_| true)
            .unwrap();
        assert!(found.is_ambiguous(8.0));
        assert!(!found.is_ambiguous(0.0));
    }

    #[test]
    fn test_color_of() {
        assert_eq!(
            palette().color_of(&Category::Sewer),
            Some(Color::from_rgb8(0, 128, 0))
        );
        assert_eq!(palette().color_of(&Category::Gas), None);
    }
}
