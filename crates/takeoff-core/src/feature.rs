//! Classified drawing features.

use serde::{Deserialize, Serialize};

use crate::{category::Category, geometry::Point};

/// A vector element (or merged group of them) with a semantic category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedFeature {
    pub category: Category,
    /// Polyline vertices, or a closed ring for area categories.
    pub points: Vec<Point>,
    #[serde(default)]
    pub diameter_in: Option<f64>,
    #[serde(default)]
    pub material: Option<String>,
    /// Classification confidence in `0.0..=1.0`.
    pub confidence: f64,
}

impl ClassifiedFeature {
    pub fn new(category: Category, points: Vec<Point>, confidence: f64) -> Self {
        Self {
            category,
            points,
            diameter_in: None,
            material: None,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Key used to group features that may be merged and measured together.
    pub fn bucket(&self) -> FeatureBucket {
        FeatureBucket {
            category: self.category.clone(),
            material: self.material.clone(),
            diameter_tenths: self.diameter_in.map(|d| (d * 10.0).round() as i64),
        }
    }
}

/// Category/material/diameter grouping of linear features.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureBucket {
    pub category: Category,
    pub material: Option<String>,
    diameter_tenths: Option<i64>,
}

impl FeatureBucket {
    /// Nominal diameter in inches.
    pub fn diameter_in(&self) -> Option<f64> {
        self.diameter_tenths.map(|d| d as f64 / 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(ClassifiedFeature::new(Category::Water, vec![], 1.7).confidence, 1.0);
        assert_eq!(ClassifiedFeature::new(Category::Water, vec![], -0.2).confidence, 0.0);
    }

    #[test]
    fn test_bucket_groups_by_attributes() {
        let mut a = ClassifiedFeature::new(Category::Water, vec![], 1.0);
        a.diameter_in = Some(8.0);
        a.material = Some("PVC".to_string());
        let mut b = a.clone();
        b.points.push(Point::new(1.0, 1.0));
        let mut c = a.clone();
        c.diameter_in = Some(12.0);

        assert_eq!(a.bucket(), b.bucket());
        assert_ne!(a.bucket(), c.bucket());
        assert_eq!(a.bucket().diameter_in(), Some(8.0));
    }
}
