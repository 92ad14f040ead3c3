//! Conversion of classified geometry into real-world quantities.
//!
//! A [`Measurer`] only exists for a resolved calibration, so every quantity
//! it produces is scaled by a strictly positive `ft_per_unit`.

use indexmap::IndexMap;
use log::{debug, info};

use takeoff_core::{
    calibration::CalibrationResult,
    category::Category,
    element::{ElementKind, PageSnapshot},
    geometry::{Point, is_near_horizontal, polyline_length, ring_area},
    quantity::{CurbSource, LengthBucket, Quantities},
};

use crate::{classify::Classification, config::MeasureConfig, merge::GeometryMerger};

/// Pipe diameter assumed when a run has no diameter label.
pub const DEFAULT_DIAMETER_IN: f64 = 8.0;

/// Cover depth assumed when the depth to the pipe crown is unknown.
pub const DEFAULT_COVER_FT: f64 = 4.0;

/// Bedding allowance below the pipe, in feet.
const BEDDING_FT: f64 = 0.5;

/// Working room on each side of the pipe, in feet.
const SIDE_CLEARANCE_FT: f64 = 0.5;

/// Narrowest trench a machine cuts, in feet.
const MIN_TRENCH_WIDTH_FT: f64 = 2.0;

const CUBIC_FEET_PER_YARD: f64 = 27.0;

/// Excavated trench volume in cubic yards.
///
/// Depth is the cover plus half the pipe diameter plus the bedding
/// allowance; width is the pipe plus side clearance, never below two feet.
///
/// # Examples
///
/// ```
/// # use takeoff::measure::trench_volume_cy;
/// let volume = trench_volume_cy(100.0, Some(8.0), Some(4.0));
/// assert!((volume - 35.8).abs() < 0.1);
/// assert_eq!(trench_volume_cy(100.0, None, None), volume);
/// ```
pub fn trench_volume_cy(length_ft: f64, dia_in: Option<f64>, cover_ft: Option<f64>) -> f64 {
    let dia_ft = dia_in.unwrap_or(DEFAULT_DIAMETER_IN) / 12.0;
    let cover_ft = cover_ft.unwrap_or(DEFAULT_COVER_FT);
    let depth_ft = cover_ft + dia_ft / 2.0 + BEDDING_FT;
    let width_ft = MIN_TRENCH_WIDTH_FT.max(SIDE_CLEARANCE_FT + dia_ft + SIDE_CLEARANCE_FT);
    length_ft * width_ft * depth_ft / CUBIC_FEET_PER_YARD
}

/// Measures merged, classified geometry at a fixed scale.
#[derive(Debug, Clone)]
pub struct Measurer<'a> {
    config: &'a MeasureConfig,
    ft_per_unit: f64,
}

impl<'a> Measurer<'a> {
    /// Creates a measurer, or `None` when `ft_per_unit` is not a positive
    /// finite number.
    pub fn new(ft_per_unit: f64, config: &'a MeasureConfig) -> Option<Self> {
        (ft_per_unit.is_finite() && ft_per_unit > 0.0).then_some(Self {
            config,
            ft_per_unit,
        })
    }

    /// Creates a measurer for a resolved calibration.
    pub fn from_calibration(calibration: &CalibrationResult, config: &'a MeasureConfig) -> Option<Self> {
        Self::new(calibration.ft_per_unit()?, config)
    }

    pub fn ft_per_unit(&self) -> f64 {
        self.ft_per_unit
    }

    /// Length of a polyline in feet.
    pub fn length_ft(&self, points: &[Point]) -> f64 {
        polyline_length(points) * self.ft_per_unit
    }

    /// Area of a ring in square feet.
    pub fn area_sf(&self, ring: &[Point]) -> f64 {
        ring_area(ring) * self.ft_per_unit * self.ft_per_unit
    }

    /// Trench volume with the configured defaults for unknown diameter and cover.
    pub fn trench_volume(&self, length_ft: f64, dia_in: Option<f64>) -> f64 {
        trench_volume_cy(
            length_ft,
            Some(dia_in.unwrap_or(self.config.default_diameter_in)),
            Some(self.config.default_cover_ft),
        )
    }

    /// Resolves the curb length in feet.
    ///
    /// Stages are tried in order and the first positive length wins:
    /// explicit near-black strokes at least `min_curb_width` wide, then the
    /// outline of the merged pavement, then near-black strokes of any width.
    /// Stroke stages skip segments that look like a scale bar. Without any
    /// candidate geometry the length is exactly `0.0`.
    pub fn curb_length(
        &self,
        page: &PageSnapshot,
        pavement_rings: &[Vec<Point>],
        merger: &GeometryMerger,
    ) -> (f64, CurbSource) {
        let explicit = self.stroke_length(page, merger, Some(self.config.min_curb_width));
        if explicit > 0.0 {
            debug!(curb_lf = explicit; "Curb from explicit strokes");
            return (explicit, CurbSource::ExplicitStroke);
        }

        let perimeter: f64 = merger
            .outline(pavement_rings)
            .iter()
            .map(|line| self.length_ft(line))
            .sum();
        if perimeter > 0.0 {
            debug!(curb_lf = perimeter; "Curb from pavement perimeter");
            return (perimeter, CurbSource::PavementPerimeter);
        }

        let relaxed = self.stroke_length(page, merger, None);
        if relaxed > 0.0 {
            debug!(curb_lf = relaxed; "Curb from relaxed strokes");
            return (relaxed, CurbSource::RelaxedStroke);
        }

        (0.0, CurbSource::None)
    }

    /// Merged length of near-black line strokes, optionally width-filtered.
    fn stroke_length(&self, page: &PageSnapshot, merger: &GeometryMerger, min_width: Option<f64>) -> f64 {
        let Some(content) = page.content_bounds() else {
            return 0.0;
        };
        let lower_limit = content.min_y() + content.height() * self.config.lower_region_fraction;

        let segments: Vec<Vec<Point>> = page
            .vectors
            .iter()
            .filter(|e| e.kind == ElementKind::Line)
            .filter(|e| {
                e.stroke
                    .is_some_and(|c| c.is_near_black(self.config.near_black_threshold))
            })
            .filter(|e| min_width.is_none_or(|min| e.width >= min))
            .flat_map(|e| {
                e.page_points()
                    .windows(2)
                    .map(|w| (w[0], w[1]))
                    .collect::<Vec<_>>()
            })
            .filter(|(a, b)| !self.looks_like_scale_bar(*a, *b, lower_limit))
            .map(|(a, b)| vec![a, b])
            .collect();

        merger
            .merge_lines(&segments)
            .iter()
            .map(|line| self.length_ft(line))
            .sum()
    }

    fn looks_like_scale_bar(&self, a: Point, b: Point, lower_limit: f64) -> bool {
        let length_ft = a.distance(b) * self.ft_per_unit;
        is_near_horizontal(a, b, self.config.horizontal_tolerance)
            && a.y() <= lower_limit
            && b.y() <= lower_limit
            && (self.config.scale_bar_min_ft..=self.config.scale_bar_max_ft).contains(&length_ft)
    }

    /// Measures a page whose classified lines are already merged.
    pub fn measure(
        &self,
        page: &PageSnapshot,
        merged: &Classification,
        merger: &GeometryMerger,
    ) -> Quantities {
        let mut lengths_by_category: IndexMap<Category, f64> = IndexMap::new();
        let mut buckets = IndexMap::new();
        for (category, features) in &merged.lines {
            for feature in features {
                let length = self.length_ft(&feature.points);
                *lengths_by_category.entry(category.clone()).or_insert(0.0) += length;
                *buckets.entry(feature.bucket()).or_insert(0.0) += length;
            }
        }

        let length_buckets: Vec<LengthBucket> = buckets
            .into_iter()
            .map(|(bucket, length_ft)| {
                let trench_volume_cy = if bucket.category.is_utility() {
                    self.trench_volume(length_ft, bucket.diameter_in())
                } else {
                    0.0
                };
                LengthBucket {
                    diameter_in: bucket.diameter_in(),
                    category: bucket.category,
                    material: bucket.material,
                    length_ft,
                    trench_volume_cy,
                }
            })
            .collect();

        let mut areas_by_category: IndexMap<Category, f64> = IndexMap::new();
        for (category, features) in &merged.areas {
            let area: f64 = features.iter().map(|f| self.area_sf(&f.points)).sum();
            *areas_by_category.entry(category.clone()).or_insert(0.0) += area;
        }

        let length = |c: Category| lengths_by_category.get(&c).copied().unwrap_or(0.0);
        let area = |c: Category| areas_by_category.get(&c).copied().unwrap_or(0.0);
        let building_sf = area(Category::Building);
        let (curb_lf, curb_source) =
            self.curb_length(page, &merged.rings(&Category::Pavement), merger);

        let quantities = Quantities {
            water_lf: length(Category::Water),
            sewer_lf: length(Category::Sewer),
            storm_lf: length(Category::Storm),
            gas_lf: length(Category::Gas),
            electric_lf: length(Category::Electric),
            telecom_lf: length(Category::Telecom),
            curb_lf,
            curb_source,
            building_sf,
            pavement_sf: (area(Category::Pavement) - building_sf).max(0.0),
            sidewalk_sf: area(Category::Sidewalk),
            trench_volume_cy: length_buckets.iter().map(|b| b.trench_volume_cy).sum(),
            length_buckets,
            lengths_by_category,
            areas_by_category,
        };
        info!(
            curb_lf = quantities.curb_lf,
            trench_volume_cy = quantities.trench_volume_cy;
            "Quantities measured"
        );
        quantities
    }
}
