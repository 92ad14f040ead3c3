//! Pipe and structure label parsing.
//!
//! Labels on utility plans follow loose conventions such as
//! `150 LF 8" PVC @ 0.50%` next to a pipe run or `SSMH-3 RIM=101.20
//! INV IN 95.10` next to a structure. The parsers here pull out the
//! individual tokens and ignore everything else.

use std::sync::LazyLock;

use regex::Regex;
use takeoff_core::network::NodeType;

use crate::error::parse_number;

/// Nominal pipe sizes, in inches, that a diameter token may name.
pub const NOMINAL_DIAMETERS: [u32; 20] = [
    2, 3, 4, 6, 8, 10, 12, 15, 18, 21, 24, 27, 30, 36, 42, 48, 54, 60, 66, 72,
];

/// Recognized material codes, mapped to their canonical form.
const MATERIALS: [(&str, &str); 13] = [
    ("HDPE", "HDPE"),
    ("CPEP", "CPEP"),
    ("PVC", "PVC"),
    ("DIP", "DIP"),
    ("DI", "DIP"),
    ("RCP", "RCP"),
    ("CMP", "CMP"),
    ("VCP", "VCP"),
    ("CIP", "CI"),
    ("CI", "CI"),
    ("ABS", "ABS"),
    ("PE", "PE"),
    ("ADS", "HDPE"),
];

/// Structure keywords in priority order.
const STRUCTURE_KEYWORDS: [(&str, NodeType); 15] = [
    ("MANHOLE", NodeType::Manhole),
    ("SSMH", NodeType::Manhole),
    ("SDMH", NodeType::Manhole),
    ("MH", NodeType::Manhole),
    ("CATCH BASIN", NodeType::CatchBasin),
    ("CB", NodeType::CatchBasin),
    ("INLET", NodeType::Inlet),
    ("VALVE", NodeType::Valve),
    ("GV", NodeType::Valve),
    ("BFV", NodeType::Valve),
    ("HYDRANT", NodeType::Hydrant),
    ("HYD", NodeType::Hydrant),
    ("FH", NodeType::Hydrant),
    ("METER", NodeType::Meter),
    ("MTR", NodeType::Meter),
];

static DIAMETER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)Ø\s*(\d{1,2})\b|\b(\d{1,2})\s*(?:"|''|”|-?\s*IN(?:CH(?:ES)?)?\b|DIA\b)"#,
    )
    .expect("valid diameter regex")
});

static MATERIAL: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<&str> = MATERIALS.iter().map(|(code, _)| *code).collect();
    Regex::new(&format!(r"(?i)\b({})\b", alternatives.join("|"))).expect("valid material regex")
});

static LABELED_SLOPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)@\s*(?P<at>-?\d*\.?\d+)\s*%|(?:\bS\s*=\s*|\bSLOPE\s*[=:]?\s*)(?P<value>-?\d*\.?\d+)\s*(?P<pct>%)?",
    )
    .expect("valid slope regex")
});

static RIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bRIM\s*(?:EL(?:EV)?\.?)?\s*[=:]?\s*(\d[\d,]*(?:\.\d+)?)")
        .expect("valid rim regex")
});

static INVERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bINV(?:ERT)?\.?\s*(?:\(?(?:IN|OUT|[NSEW]{1,2})\)?(?:\s+|\b))?\s*(?:EL(?:EV)?\.?)?\s*[=:]?\s*(\d[\d,]*(?:\.\d+)?)",
    )
    .expect("valid invert regex")
});

static GRADE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d*\.?\d+)\s*%|\b1\s*:\s*(\d+(?:\.\d+)?)\b").expect("valid grade regex")
});

/// Tokens read from a pipe label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipeLabel {
    pub diameter_in: Option<f64>,
    pub material: Option<String>,
    /// Labeled slope in percent.
    pub slope_percent: Option<f64>,
}

impl PipeLabel {
    /// Returns true when no token was recognized.
    pub fn is_empty(&self) -> bool {
        self.diameter_in.is_none() && self.material.is_none() && self.slope_percent.is_none()
    }

    /// Fills fields that are still unknown from `other`.
    pub fn merge(&mut self, other: PipeLabel) {
        self.diameter_in = self.diameter_in.or(other.diameter_in);
        self.material = self.material.take().or(other.material);
        self.slope_percent = self.slope_percent.or(other.slope_percent);
    }
}

/// Tokens read from a structure label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructureLabel {
    pub node_type: Option<NodeType>,
    pub rim_elevation: Option<f64>,
    /// Every invert elevation in label order.
    pub inverts: Vec<f64>,
}

impl StructureLabel {
    /// The lowest labeled invert, which is the outlet of a gravity structure.
    pub fn lowest_invert(&self) -> Option<f64> {
        self.inverts.iter().copied().reduce(f64::min)
    }
}

/// Reads a nominal diameter in inches.
///
/// Only sizes from [`NOMINAL_DIAMETERS`] are accepted, so stray numbers
/// followed by an inch mark (`2"` text heights, sheet numbers) are rarely
/// misread.
///
/// # Examples
///
/// ```
/// # use takeoff_parser::label::parse_diameter;
/// assert_eq!(parse_diameter("8\" PVC"), Some(8.0));
/// assert_eq!(parse_diameter("12-INCH RCP"), Some(12.0));
/// assert_eq!(parse_diameter("7\" CURB"), None);
/// ```
pub fn parse_diameter(text: &str) -> Option<f64> {
    DIAMETER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|size| size.as_str().parse::<u32>().ok())
        .find(|size| NOMINAL_DIAMETERS.contains(size))
        .map(f64::from)
}

/// Reads a material code, returning its canonical form.
pub fn parse_material(text: &str) -> Option<String> {
    let found = MATERIAL.captures(text)?;
    let code = found[1].to_ascii_uppercase();
    MATERIALS
        .iter()
        .find(|(alias, _)| *alias == code)
        .map(|(_, canonical)| canonical.to_string())
}

/// Reads a labeled slope, in percent.
///
/// `S=0.50%` and `@ 0.5%` are percentages; a bare `S=0.005` is a fraction.
/// The `@` form needs its `%`, since `@ 0.40` could be a spacing or a count.
pub fn parse_labeled_slope(text: &str) -> Option<f64> {
    let caps = LABELED_SLOPE.captures(text)?;
    if let Some(at) = caps.name("at") {
        return parse_number(at.as_str()).ok();
    }
    let value = parse_number(caps.name("value")?.as_str()).ok()?;
    if caps.name("pct").is_some() {
        Some(value)
    } else {
        Some(value * 100.0)
    }
}

/// Reads every pipe token in `text`.
pub fn parse_pipe_label(text: &str) -> PipeLabel {
    PipeLabel {
        diameter_in: parse_diameter(text),
        material: parse_material(text),
        slope_percent: parse_labeled_slope(text),
    }
}

/// Finds the structure type named in `text`, if any.
pub fn structure_type(text: &str) -> Option<NodeType> {
    let upper = text.to_ascii_uppercase();
    STRUCTURE_KEYWORDS
        .iter()
        .find(|(keyword, _)| contains_word(&upper, keyword))
        .map(|(_, node_type)| *node_type)
}

/// Reads the structure type and elevations in `text`.
pub fn parse_structure_label(text: &str) -> StructureLabel {
    StructureLabel {
        node_type: structure_type(text),
        rim_elevation: RIM
            .captures(text)
            .and_then(|caps| parse_number(&caps[1]).ok()),
        inverts: INVERT
            .captures_iter(text)
            .filter_map(|caps| parse_number(&caps[1]).ok())
            .collect(),
    }
}

/// Reads a grade as a percentage; `1:12` is read as rise over run.
pub fn parse_grade_percent(text: &str) -> Option<f64> {
    let caps = GRADE.captures(text)?;
    if let Some(percent) = caps.get(1) {
        return parse_number(percent.as_str()).ok();
    }
    let run = parse_number(caps.get(2)?.as_str()).ok()?;
    (run > 0.0).then(|| 100.0 / run)
}

/// Returns true if `word` occurs in `haystack` delimited by non-alphanumerics.
///
/// Both arguments are expected in the same case.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
