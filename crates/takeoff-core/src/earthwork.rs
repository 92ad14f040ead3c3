//! Earthwork (cut/fill) schedule types.

use serde::{Deserialize, Serialize};

use crate::geometry::Bounds;

/// One station range of an earthwork schedule.
///
/// Stations are kept as written on the sheet; volumes that could not be read
/// are zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EarthworkRow {
    pub station_start: String,
    pub station_end: String,
    pub cut_yd3: f64,
    pub fill_yd3: f64,
    pub net_yd3: f64,
    pub area_sf: f64,
    #[serde(default)]
    pub note: Option<String>,
}

/// A parsed earthwork schedule with its aggregate totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarthworkTable {
    pub title: String,
    pub rows: Vec<EarthworkRow>,
    pub total_cut_yd3: f64,
    pub total_fill_yd3: f64,
    pub total_net_yd3: f64,
    pub source_bounds: Bounds,
}

impl EarthworkTable {
    /// Builds a table, computing totals from the rows.
    ///
    /// Totals are the sums of row cut and row fill; net is `cut - fill`.
    pub fn new(title: impl Into<String>, rows: Vec<EarthworkRow>, source_bounds: Bounds) -> Self {
        let total_cut_yd3: f64 = rows.iter().map(|r| r.cut_yd3).sum();
        let total_fill_yd3: f64 = rows.iter().map(|r| r.fill_yd3).sum();
        Self {
            title: title.into(),
            rows,
            total_cut_yd3,
            total_fill_yd3,
            total_net_yd3: total_cut_yd3 - total_fill_yd3,
            source_bounds,
        }
    }
}
