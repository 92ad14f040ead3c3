//! Measured quantities.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Linear footage of one category/material/diameter bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthBucket {
    pub category: Category,
    pub material: Option<String>,
    pub diameter_in: Option<f64>,
    pub length_ft: f64,
    pub trench_volume_cy: f64,
}

/// Which stage resolved the curb length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurbSource {
    ExplicitStroke,
    PavementPerimeter,
    RelaxedStroke,
    #[default]
    None,
}

/// Real-world quantities for one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantities {
    pub water_lf: f64,
    pub sewer_lf: f64,
    pub storm_lf: f64,
    pub gas_lf: f64,
    pub electric_lf: f64,
    pub telecom_lf: f64,
    pub curb_lf: f64,
    pub curb_source: CurbSource,
    pub building_sf: f64,
    /// Pavement net of building footprints.
    pub pavement_sf: f64,
    pub sidewalk_sf: f64,
    pub trench_volume_cy: f64,
    /// Linear footage per category/material/diameter bucket.
    pub length_buckets: Vec<LengthBucket>,
    /// Length of every linear category, including ones without a named field.
    pub lengths_by_category: IndexMap<Category, f64>,
    /// Raw area of every area category.
    pub areas_by_category: IndexMap<Category, f64>,
}

impl Quantities {
    /// Total linear footage of a category.
    pub fn length_of(&self, category: &Category) -> f64 {
        self.lengths_by_category.get(category).copied().unwrap_or(0.0)
    }
}

/// Cut/fill volumes measured independently of the sheet schedules
/// (for example from surface comparison), used for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeasuredEarthwork {
    pub cut_cy: Option<f64>,
    pub fill_cy: Option<f64>,
}
