//! Earthwork schedule extraction from positioned text.
//!
//! Schedules are found by their title (`EARTHWORK SUMMARY` and similar),
//! the text below each title is grouped into rows by baseline, and every row
//! is read for a station range and its cut, fill, net and area values.
//! Page space is y-up, so "below" means smaller y.

use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;
use takeoff_core::{
    earthwork::{EarthworkRow, EarthworkTable},
    element::TextElement,
    geometry::Bounds,
};

use crate::{
    error::parse_number,
    label::contains_word,
    station::{find_station_range, is_bare_station},
};

/// Title phrases that open an earthwork schedule, in normalized form.
pub const TABLE_HEADERS: [&str; 4] = [
    "earthwork summary",
    "cut and fill summary",
    "cut/fill summary",
    "volume summary",
];

const NUMBER: &str = r"-?\d[\d,]*(?:\.\d+)?";
const VOLUME_UNIT: &str = r"(?:YD3|CUBIC\s+YARDS?|CU\.?\s*YDS?|CY)\b";
const AREA_UNIT: &str = r"(?:SF|SQ\.?\s*FT|SQUARE\s+F(?:EE|OO)T)\b";

static LABELED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(CUT|FILL|NET)\b\s*[:=]?\s*({NUMBER})"))
        .expect("valid labeled value regex")
});

static VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({NUMBER})\s*{VOLUME_UNIT}")).expect("valid volume regex")
});

static AREA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)({NUMBER})\s*{AREA_UNIT}")).expect("valid area regex")
});

static CELL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*({NUMBER})\s*(?:{VOLUME_UNIT}|{AREA_UNIT})?\.?\s*$"
    ))
    .expect("valid cell number regex")
});

static NUMBER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_.])\d").expect("valid number token regex")
});

/// Layout parameters of the schedule search.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthworkOptions {
    /// Width of the region searched to the right of a title's left edge.
    pub region_width: f64,
    /// Depth of the region searched below a title.
    pub region_height: f64,
    /// Slack to the left of a title's left edge.
    pub left_margin: f64,
    /// Maximum baseline difference of cells in one row.
    pub row_tolerance: f64,
}

impl Default for EarthworkOptions {
    fn default() -> Self {
        Self {
            region_width: 600.0,
            region_height: 400.0,
            left_margin: 40.0,
            row_tolerance: 4.0,
        }
    }
}

/// Schedule column a numeric cell can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Cut,
    Fill,
    Net,
    Area,
}

impl Column {
    fn keyword(self) -> &'static str {
        match self {
            Column::Cut => "CUT",
            Column::Fill => "FILL",
            Column::Net => "NET",
            Column::Area => "AREA",
        }
    }
}

const COLUMNS: [Column; 4] = [Column::Cut, Column::Fill, Column::Net, Column::Area];

/// Values read from one row; `None` means not found.
#[derive(Debug, Default)]
struct RowValues {
    cut: Option<f64>,
    fill: Option<f64>,
    net: Option<f64>,
    area: Option<f64>,
}

impl RowValues {
    fn slot(&mut self, column: Column) -> &mut Option<f64> {
        match column {
            Column::Cut => &mut self.cut,
            Column::Fill => &mut self.fill,
            Column::Net => &mut self.net,
            Column::Area => &mut self.area,
        }
    }

    fn fill_slot(&mut self, column: Column, value: f64) {
        let slot = self.slot(column);
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn has_volume(&self) -> bool {
        self.cut.is_some() || self.fill.is_some() || self.net.is_some()
    }

    fn is_empty(&self) -> bool {
        !self.has_volume() && self.area.is_none()
    }
}

/// Extracts earthwork schedules from text elements.
///
/// Parsing never fails: cells that cannot be read leave the row's fields at
/// zero, and a title without readable rows yields an empty table.
#[derive(Debug, Clone, Default)]
pub struct EarthworkParser {
    options: EarthworkOptions,
}

impl EarthworkParser {
    pub fn new(options: EarthworkOptions) -> Self {
        Self { options }
    }

    /// Finds every schedule in `texts`, in title order.
    ///
    /// `texts` may be pooled from several sheets.
    pub fn parse(&self, texts: &[TextElement]) -> Vec<EarthworkTable> {
        let headers: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| is_table_header(&t.text))
            .map(|(idx, _)| idx)
            .collect();
        debug!(headers = headers.len(); "Searching for earthwork schedules");

        headers
            .iter()
            .map(|&header_idx| self.parse_table(texts, header_idx, &headers))
            .collect()
    }

    fn parse_table(
        &self,
        texts: &[TextElement],
        header_idx: usize,
        headers: &[usize],
    ) -> EarthworkTable {
        let header = &texts[header_idx];
        let region = self.region_below(header, headers.iter().map(|&idx| &texts[idx]));

        let members: Vec<&TextElement> = texts
            .iter()
            .enumerate()
            .filter(|(idx, t)| !headers.contains(idx) && region.contains(t.center()))
            .map(|(_, t)| t)
            .collect();

        let source_bounds = members
            .iter()
            .fold(header.bounds, |acc, t| acc.merge(&t.bounds));

        let mut columns: Vec<(Column, f64)> = Vec::new();
        let mut rows = Vec::new();
        for cells in self.cluster_rows(members) {
            if let Some(found) = column_header(&cells) {
                trace!(columns = found.len(); "Found schedule column header");
                columns = found;
                continue;
            }
            if let Some(row) = parse_row(&cells, &columns) {
                rows.push(row);
            }
        }

        let table = EarthworkTable::new(header.text.trim(), rows, source_bounds);
        debug!(
            title = table.title.as_str(),
            rows = table.rows.len(),
            total_cut = table.total_cut_yd3,
            total_fill = table.total_fill_yd3;
            "Parsed earthwork schedule"
        );
        table
    }

    /// The search region below `header`, cut short by any other title inside it.
    fn region_below<'a>(
        &self,
        header: &TextElement,
        headers: impl Iterator<Item = &'a TextElement>,
    ) -> Bounds {
        let b = header.bounds;
        let top = header.center().y() - self.options.row_tolerance;
        let left = b.min_x() - self.options.left_margin;
        let right = b.max_x().max(b.min_x() + self.options.region_width);
        let mut bottom = b.min_y() - self.options.region_height;

        for other in headers {
            let center = other.center();
            let inside = center.x() >= left
                && center.x() <= right
                && center.y() < top
                && center.y() >= bottom;
            if inside && !std::ptr::eq(other, header) {
                bottom = bottom.max(other.bounds.max_y());
            }
        }
        Bounds::new(left, bottom, right, top)
    }

    /// Groups texts into rows, top to bottom, each row sorted left to right.
    fn cluster_rows<'a>(&self, mut members: Vec<&'a TextElement>) -> Vec<Vec<&'a TextElement>> {
        members.sort_by(|a, b| {
            let (ca, cb) = (a.center(), b.center());
            cb.y().total_cmp(&ca.y()).then(ca.x().total_cmp(&cb.x()))
        });

        let mut rows: Vec<Vec<&TextElement>> = Vec::new();
        let mut anchor_y = f64::NAN;
        for text in members {
            let y = text.center().y();
            match rows.last_mut() {
                Some(row) if (anchor_y - y).abs() <= self.options.row_tolerance => row.push(text),
                _ => {
                    anchor_y = y;
                    rows.push(vec![text]);
                }
            }
        }
        for row in &mut rows {
            row.sort_by(|a, b| a.center().x().total_cmp(&b.center().x()));
        }
        rows
    }
}

/// Returns true if `text` is an earthwork schedule title.
pub fn is_table_header(text: &str) -> bool {
    let normalized = text
        .to_lowercase()
        .replace('&', " and ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    TABLE_HEADERS.iter().any(|header| normalized.contains(header))
}

/// Recognizes a column header row and returns the x-center of each column.
///
/// A header row names both `CUT` and `FILL` and carries no numbers.
fn column_header(cells: &[&TextElement]) -> Option<Vec<(Column, f64)>> {
    let joined = joined_upper(cells);
    if !contains_word(&joined, "CUT")
        || !contains_word(&joined, "FILL")
        || NUMBER_TOKEN.is_match(&joined)
    {
        return None;
    }

    let columns = cells
        .iter()
        .filter_map(|cell| {
            let upper = cell.text.to_ascii_uppercase();
            let mut named = COLUMNS.iter().filter(|c| contains_word(&upper, c.keyword()));
            match (named.next(), named.next()) {
                (Some(column), None) => Some((*column, cell.center().x())),
                _ => None,
            }
        })
        .collect();
    Some(columns)
}

fn joined_upper(cells: &[&TextElement]) -> String {
    cells
        .iter()
        .map(|c| c.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn nearest_column(columns: &[(Column, f64)], x: f64) -> Option<Column> {
    columns
        .iter()
        .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
        .map(|(column, _)| *column)
}

/// Reads one data row. Returns `None` for total rows and rows without digits.
fn parse_row(cells: &[&TextElement], columns: &[(Column, f64)]) -> Option<EarthworkRow> {
    let joined = joined_upper(cells);
    if contains_word(&joined, "TOTAL") || contains_word(&joined, "TOTALS") {
        trace!(row = joined.as_str(); "Skipping total row");
        return None;
    }
    if !joined.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut values = RowValues::default();

    if !columns.is_empty() {
        for cell in cells {
            if is_bare_station(&cell.text) || find_station_range(&cell.text).is_some() {
                continue;
            }
            let Some(caps) = CELL_NUMBER.captures(&cell.text) else {
                continue;
            };
            let column = nearest_column(columns, cell.center().x());
            let (Ok(value), Some(column)) = (parse_number(&caps[1]), column) else {
                continue;
            };
            values.fill_slot(column, value);
        }
    }

    for caps in LABELED_VALUE.captures_iter(&joined) {
        let column = match &caps[1] {
            "CUT" => Column::Cut,
            "FILL" => Column::Fill,
            _ => Column::Net,
        };
        if let Ok(value) = parse_number(&caps[2]) {
            values.fill_slot(column, value);
        }
    }

    if !values.has_volume() {
        let volumes = VOLUME
            .captures_iter(&joined)
            .filter_map(|caps| parse_number(&caps[1]).ok());
        for (column, value) in [Column::Cut, Column::Fill, Column::Net].into_iter().zip(volumes) {
            values.fill_slot(column, value);
        }
    }

    if values.area.is_none() {
        values.area = AREA
            .captures(&joined)
            .and_then(|caps| parse_number(&caps[1]).ok());
    }

    let station = find_station_range(&joined);
    let note = values.is_empty().then(|| joined.clone());
    let cut_yd3 = values.cut.unwrap_or(0.0);
    let fill_yd3 = values.fill.unwrap_or(0.0);
    let row = EarthworkRow {
        station_start: station.as_ref().map(|s| s.start.clone()).unwrap_or_default(),
        station_end: station.map(|s| s.end).unwrap_or_default(),
        cut_yd3,
        fill_yd3,
        net_yd3: values.net.unwrap_or(cut_yd3 - fill_yd3),
        area_sf: values.area.unwrap_or(0.0),
        note,
    };
    trace!(row:?; "Parsed schedule row");
    Some(row)
}


#[cfg(test)]
mod proptest_tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;
    use takeoff_core::geometry::Point;

    use super::*;

    /// Table totals equal the sums of the parsed rows, whatever the values.
    fn check_totals_match_rows(volumes: &[(u16, u16)]) -> Result<(), TestCaseError> {
        let mut texts = vec![TextElement::at("EARTHWORK SUMMARY", Point::new(100.0, 1000.0))];
        for (i, (cut, fill)) in volumes.iter().enumerate() {
            let y = 980.0 - 15.0 * i as f64;
            texts.push(TextElement::at(
                format!("STA {i}+00 TO {}+00 {cut} CY {fill} CY", i + 1),
                Point::new(150.0, y),
            ));
        }
        let parser = EarthworkParser::new(EarthworkOptions {
            region_height: 2000.0,
            ..EarthworkOptions::default()
        });
        let tables = parser.parse(&texts);
        prop_assert_eq!(tables.len(), 1);

        let table = &tables[0];
        prop_assert_eq!(table.rows.len(), volumes.len());
        let cut: f64 = volumes.iter().map(|(c, _)| f64::from(*c)).sum();
        let fill: f64 = volumes.iter().map(|(_, f)| f64::from(*f)).sum();
        prop_assert!(approx_eq!(f64, table.total_cut_yd3, cut));
        prop_assert!(approx_eq!(f64, table.total_fill_yd3, fill));
        prop_assert!(approx_eq!(f64, table.total_net_yd3, cut - fill));
        Ok(())
    }

    proptest! {
        #[test]
        fn totals_match_rows(volumes in prop::collection::vec((0u16..5000, 0u16..5000), 0..20)) {
            check_totals_match_rows(&volumes)?;
        }
    }
}
