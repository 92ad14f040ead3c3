//! The built-in QA checks.

use log::trace;

use takeoff_core::{
    earthwork::EarthworkTable,
    element::{PageSnapshot, VectorElement},
    geometry::{Point, polyline_midpoint},
    network::{Edge, Network},
    qa::{QaRule, QaViolation, Severity},
    quantity::MeasuredEarthwork,
};
use takeoff_parser::{
    label::{contains_word, parse_grade_percent},
    station::station_to_feet,
};

use super::thresholds::{AdaThresholds, QaThresholds, ScheduleThresholds, SewerThresholds};

/// Everything a check may inspect.
#[derive(Debug, Clone, Copy, Default)]
pub struct QaContext<'a> {
    pub networks: &'a [Network],
    /// Raw page geometry, for geometry-level checks.
    pub page: Option<&'a PageSnapshot>,
    pub tables: &'a [EarthworkTable],
    /// Independently measured cut and fill.
    pub measured: Option<MeasuredEarthwork>,
}

/// One rule evaluated against a [`QaContext`].
pub trait QaCheck {
    fn rule(&self) -> &QaRule;

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation>;
}

/// The default rule set, configured from `thresholds`.
pub fn default_checks(thresholds: &QaThresholds) -> Vec<Box<dyn QaCheck>> {
    vec![
        Box::new(SewerMinSlope::new(&thresholds.sewer)),
        Box::new(SewerMaxSlope::new(&thresholds.sewer)),
        Box::new(AdaRampSlope::new(&thresholds.ada)),
        Box::new(AdaRampWidth::new(&thresholds.ada)),
        Box::new(ScheduleReconciliation::new(&thresholds.schedule)),
        Box::new(ScheduleStationOrder::new()),
    ]
}

/// Gravity edges with a known slope, with the network they belong to.
fn gravity_slopes<'a>(networks: &'a [Network]) -> impl Iterator<Item = (&'a Edge, f64)> {
    networks
        .iter()
        .filter(|network| network.category.is_gravity())
        .flat_map(|network| network.edges.iter())
        .filter_map(|edge| Some((edge, edge.slope_percent()?)))
}

fn edge_violation(rule: &QaRule, edge: &Edge, message: String, slope: f64, limit: f64) -> QaViolation {
    QaViolation::new(rule, message)
        .at(polyline_midpoint(&edge.points))
        .referencing(edge.id.clone())
        .with_detail("slope_percent", slope)
        .with_detail("limit_percent", limit)
}

pub struct SewerMinSlope {
    rule: QaRule,
    min_percent: f64,
}

impl SewerMinSlope {
    pub fn new(thresholds: &SewerThresholds) -> Self {
        Self {
            rule: QaRule::new(
                "sewer_min_slope",
                "Minimum gravity pipe slope",
                "Sanitary and storm pipes must drain at least at the minimum slope",
                Severity::Error,
                "sewer",
            ),
            min_percent: thresholds.min_slope_percent,
        }
    }
}

impl QaCheck for SewerMinSlope {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        gravity_slopes(context.networks)
            .filter(|(_, slope)| *slope < self.min_percent)
            .map(|(edge, slope)| {
                let message = format!(
                    "Pipe {} slope {slope:.2}% is below the minimum of {:.2}%",
                    edge.id, self.min_percent
                );
                edge_violation(&self.rule, edge, message, slope, self.min_percent)
            })
            .collect()
    }
}

pub struct SewerMaxSlope {
    rule: QaRule,
    max_percent: f64,
}

impl SewerMaxSlope {
    pub fn new(thresholds: &SewerThresholds) -> Self {
        Self {
            rule: QaRule::new(
                "sewer_max_slope",
                "Maximum gravity pipe slope",
                "Steep gravity pipes scour and need review",
                Severity::Warning,
                "sewer",
            ),
            max_percent: thresholds.max_slope_percent,
        }
    }
}

impl QaCheck for SewerMaxSlope {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        gravity_slopes(context.networks)
            .filter(|(_, slope)| *slope > self.max_percent)
            .map(|(edge, slope)| {
                let message = format!(
                    "Pipe {} slope {slope:.2}% exceeds the maximum of {:.2}%",
                    edge.id, self.max_percent
                );
                edge_violation(&self.rule, edge, message, slope, self.max_percent)
            })
            .collect()
    }
}

/// A ramp stroke found on the page.
struct Ramp<'a> {
    index: usize,
    element: &'a VectorElement,
    midpoint: Point,
    /// Grade read from the nearest grade label, in percent.
    slope_percent: Option<f64>,
}

/// Elements on a ramp layer or labeled `RAMP` nearby.
fn find_ramps<'a>(page: &'a PageSnapshot, radius: f64) -> Vec<Ramp<'a>> {
    let limit = radius * radius;
    page.vectors
        .iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let midpoint = element.midpoint()?;
            let mut near: Vec<(f64, &str)> = page
                .texts
                .iter()
                .map(|t| (t.center().distance_squared(midpoint), t.text.as_str()))
                .filter(|(d2, _)| *d2 <= limit)
                .collect();
            near.sort_by(|a, b| a.0.total_cmp(&b.0));

            let labeled = near
                .iter()
                .any(|(_, text)| contains_word(&text.to_ascii_uppercase(), "RAMP"));
            if !element.in_layer_matching("ramp") && !labeled {
                return None;
            }
            let slope_percent = near.iter().find_map(|(_, text)| parse_grade_percent(text));
            trace!(index, slope_percent:?; "Ramp candidate");
            Some(Ramp {
                index,
                element,
                midpoint,
                slope_percent,
            })
        })
        .collect()
}

pub struct AdaRampSlope {
    rule: QaRule,
    thresholds: AdaThresholds,
}

impl AdaRampSlope {
    pub fn new(thresholds: &AdaThresholds) -> Self {
        Self {
            rule: QaRule::new(
                "ada_ramp_slope",
                "ADA ramp slope",
                "Accessible ramps must not exceed the maximum running slope",
                Severity::Error,
                "ada",
            ),
            thresholds: thresholds.clone(),
        }
    }
}

impl QaCheck for AdaRampSlope {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        let Some(page) = context.page else {
            return Vec::new();
        };
        let max = self.thresholds.max_ramp_slope_percent;
        find_ramps(page, self.thresholds.label_radius)
            .into_iter()
            .filter_map(|ramp| {
                let slope = ramp.slope_percent.filter(|s| *s > max)?;
                let message = format!("Ramp slope {slope:.2}% exceeds the maximum of {max:.2}%");
                Some(
                    QaViolation::new(&self.rule, message)
                        .at(Some(ramp.midpoint))
                        .referencing(format!("element-{}", ramp.index))
                        .with_detail("slope_percent", slope)
                        .with_detail("limit_percent", max),
                )
            })
            .collect()
    }
}

pub struct AdaRampWidth {
    rule: QaRule,
    thresholds: AdaThresholds,
}

impl AdaRampWidth {
    pub fn new(thresholds: &AdaThresholds) -> Self {
        Self {
            rule: QaRule::new(
                "ada_ramp_width",
                "ADA ramp stroke width",
                "Ramp outlines drawn wider than expected need review",
                Severity::Warning,
                "ada",
            ),
            thresholds: thresholds.clone(),
        }
    }
}

impl QaCheck for AdaRampWidth {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        let Some(page) = context.page else {
            return Vec::new();
        };
        let max = self.thresholds.max_ramp_stroke_width;
        find_ramps(page, self.thresholds.label_radius)
            .into_iter()
            .filter(|ramp| ramp.element.width > max)
            .map(|ramp| {
                let width = ramp.element.width;
                QaViolation::new(
                    &self.rule,
                    format!("Ramp stroke width {width:.2} exceeds the maximum of {max:.2}"),
                )
                .at(Some(ramp.midpoint))
                .referencing(format!("element-{}", ramp.index))
                .with_detail("stroke_width", width)
                .with_detail("limit", max)
            })
            .collect()
    }
}

/// Relative difference of `measured` from `scheduled`, in percent.
///
/// A zero schedule with a non-zero measurement counts as 100%.
pub fn relative_difference_percent(measured: f64, scheduled: f64) -> f64 {
    if scheduled == 0.0 {
        return if measured == 0.0 { 0.0 } else { 100.0 };
    }
    (measured - scheduled).abs() / scheduled.abs() * 100.0
}

pub struct ScheduleReconciliation {
    rule: QaRule,
    tolerance_percent: f64,
}

impl ScheduleReconciliation {
    pub fn new(thresholds: &ScheduleThresholds) -> Self {
        Self {
            rule: QaRule::new(
                "schedule_reconciliation",
                "Earthwork schedule reconciliation",
                "Scheduled cut and fill must agree with measured volumes",
                Severity::Warning,
                "schedule",
            ),
            tolerance_percent: thresholds.tolerance_percent,
        }
    }

    fn compare(&self, quantity: &str, measured: Option<f64>, scheduled: f64) -> Option<QaViolation> {
        let measured = measured?;
        let diff = relative_difference_percent(measured, scheduled);
        if diff <= self.tolerance_percent {
            return None;
        }
        let message = format!(
            "Measured {quantity} {measured:.1} CY vs scheduled {scheduled:.1} CY: {diff:.1}% difference"
        );
        Some(
            QaViolation::new(&self.rule, message)
                .referencing(quantity.to_string())
                .with_detail("measured_cy", measured)
                .with_detail("scheduled_cy", scheduled)
                .with_detail("difference_percent", diff),
        )
    }
}

impl QaCheck for ScheduleReconciliation {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        let Some(measured) = context.measured else {
            return Vec::new();
        };
        if context.tables.is_empty() {
            return Vec::new();
        }
        let cut: f64 = context.tables.iter().map(|t| t.total_cut_yd3).sum();
        let fill: f64 = context.tables.iter().map(|t| t.total_fill_yd3).sum();

        [
            self.compare("cut", measured.cut_cy, cut),
            self.compare("fill", measured.fill_cy, fill),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

pub struct ScheduleStationOrder {
    rule: QaRule,
}

impl ScheduleStationOrder {
    pub fn new() -> Self {
        Self {
            rule: QaRule::new(
                "schedule_station_order",
                "Earthwork station order",
                "Each schedule row must end at or after the station it starts at",
                Severity::Warning,
                "schedule",
            ),
        }
    }
}

impl Default for ScheduleStationOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl QaCheck for ScheduleStationOrder {
    fn rule(&self) -> &QaRule {
        &self.rule
    }

    fn check(&self, context: &QaContext<'_>) -> Vec<QaViolation> {
        let mut violations = Vec::new();
        for table in context.tables {
            for row in &table.rows {
                let (Ok(start), Ok(end)) = (
                    station_to_feet(&row.station_start),
                    station_to_feet(&row.station_end),
                ) else {
                    continue;
                };
                if end < start {
                    violations.push(
                        QaViolation::new(
                            &self.rule,
                            format!(
                                "Row {} to {} in \"{}\" runs backwards",
                                row.station_start, row.station_end, table.title
                            ),
                        )
                        .referencing(table.title.clone())
                        .with_detail("station_start", row.station_start.clone())
                        .with_detail("station_end", row.station_end.clone()),
                    );
                }
            }
        }
        violations
    }
}
