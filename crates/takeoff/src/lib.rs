//! Takeoff - quantity takeoff and design QA for vectorized civil drawings.
//!
//! A run takes the vector and text primitives of one drawing page and
//! produces scaled engineering quantities, utility networks and rule
//! violations:
//!
//! 1. [`calibrate`]: resolve feet per page unit from a scale bar or override
//! 2. [`classify`]: assign categories by legend, palette color and nearby text
//! 3. [`merge`]: snap and merge fragmented strokes into continuous polylines
//! 4. [`measure`]: lengths, areas, trench volumes and curb
//! 5. [`network`]: node/edge topology per utility
//! 6. earthwork schedules parsed from the page and its sibling sheets
//! 7. [`qa`]: rule checks over all of the above
//!
//! Every stage is deterministic and keeps no state between runs.

pub mod calibrate;
pub mod classify;
pub mod config;
pub mod export;
pub mod measure;
pub mod merge;
pub mod network;
pub mod qa;
pub mod report;
pub mod source;

mod error;

pub use takeoff_core::{category, element, geometry, quantity};

pub use error::TakeoffError;

use std::path::Path;

use log::{debug, info};

use takeoff_core::{
    element::{PageSnapshot, TextElement},
    quantity::MeasuredEarthwork,
};
use takeoff_parser::EarthworkParser;

use calibrate::ScaleCalibrator;
use classify::{
    Classification, ColorClassifier, ElementHints, FeatureClassifier, LegendRuleProvider,
    SwatchLegendProvider, legend_keyword_rules,
};
use config::AppConfig;
use export::{Exporter, svg::OverlayExporter};
use measure::Measurer;
use merge::GeometryMerger;
use network::{NetworkBuilder, Topology};
use qa::{QaContext, QaEngine, QaThresholds};
use report::{Diagnostics, Overlay, TakeoffReport};
use source::GeometrySource;

/// Per-run inputs besides the page itself.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Feet per page unit; skips scale-bar detection.
    pub manual_scale: Option<f64>,
    /// Pages whose swatches and labels define legend rules.
    pub legend_pages: Vec<usize>,
    /// Pages whose text is pooled for earthwork schedules.
    pub sibling_pages: Vec<usize>,
    /// Independently measured cut and fill, for schedule reconciliation.
    pub measured: Option<MeasuredEarthwork>,
    /// Extra label text per element index of the main page.
    pub hints: ElementHints,
}

/// Runs the takeoff pipeline.
///
/// # Examples
///
/// ```
/// use takeoff::{RunOptions, TakeoffBuilder, config::AppConfig};
/// use takeoff_core::{color::Color, element::{PageSnapshot, VectorElement}, geometry::Point};
///
/// let page = PageSnapshot::new(
///     vec![VectorElement::line(
///         vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
///         Color::new("#0000ff").unwrap(),
///         1.0,
///     )],
///     vec![],
/// );
///
/// let options = RunOptions { manual_scale: Some(2.0), ..RunOptions::default() };
/// let report = TakeoffBuilder::new(AppConfig::default())
///     .run_page(&page, &[], &[], &options)
///     .unwrap();
///
/// assert_eq!(report.quantities.unwrap().water_lf, 200.0);
/// assert_eq!(report.networks.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TakeoffBuilder {
    config: AppConfig,
    thresholds: QaThresholds,
}

impl TakeoffBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            thresholds: QaThresholds::default(),
        }
    }

    /// Sets the QA thresholds, builder style.
    pub fn with_thresholds(mut self, thresholds: QaThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Runs the pipeline on page `page_index` of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Source`] when a requested page is missing and
    /// [`TakeoffError::InvalidManualScale`] for a non-positive manual scale.
    pub fn run(
        &self,
        source: &dyn GeometrySource,
        page_index: usize,
        options: &RunOptions,
    ) -> Result<TakeoffReport, TakeoffError> {
        let page = source.page(page_index)?;
        let siblings = options
            .sibling_pages
            .iter()
            .map(|index| source.page(*index))
            .collect::<Result<Vec<_>, _>>()?;
        let legend = options
            .legend_pages
            .iter()
            .map(|index| source.page(*index))
            .collect::<Result<Vec<_>, _>>()?;
        self.run_page(&page, &siblings, &legend, options)
    }

    /// Runs the pipeline on a page already in y-up page space.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::InvalidManualScale`] for a non-positive manual
    /// scale. Nothing else fails.
    pub fn run_page(
        &self,
        page: &PageSnapshot,
        siblings: &[PageSnapshot],
        legend_pages: &[PageSnapshot],
        options: &RunOptions,
    ) -> Result<TakeoffReport, TakeoffError> {
        info!(
            vectors_count = page.vectors.len(),
            texts_count = page.texts.len();
            "Starting takeoff"
        );

        let calibration =
            ScaleCalibrator::new(self.config.calibration()).calibrate(page, options.manual_scale)?;

        let classify_config = self.config.classify();
        let palette = self.config.palette().palette();
        let classifier = ColorClassifier::new(palette.clone(), classify_config);
        let legend_rules = SwatchLegendProvider::new(
            legend_keyword_rules(classifier.keyword_rules()),
            classify_config.legend_label_radius,
            classify_config.legend_max_swatch_length,
        )
        .legend_rules(legend_pages);
        let classification = classifier.classify(page, &legend_rules, &options.hints);

        let merger = GeometryMerger::new(self.config.merge());
        let merged = Classification {
            lines: classification
                .lines
                .iter()
                .map(|(category, features)| (category.clone(), merger.merge_features(features)))
                .collect(),
            areas: classification.areas.clone(),
        };
        debug!(merged_lines_count = merged.line_count(); "Lines merged");

        let quantities = Measurer::from_calibration(&calibration, self.config.measure())
            .map(|measurer| measurer.measure(page, &merged, &merger));

        let networks = NetworkBuilder::new(self.config.network())
            .with_scale(calibration.ft_per_unit())
            .build_all(&merged, &page.texts);
        let network_summaries = networks
            .iter()
            .map(|network| Topology::new(network).summary())
            .collect();

        let pooled: Vec<TextElement> = page
            .texts
            .iter()
            .chain(siblings.iter().flat_map(|sibling| &sibling.texts))
            .cloned()
            .collect();
        let earthwork_tables = EarthworkParser::new(self.config.earthwork().options()).parse(&pooled);

        let violations = QaEngine::new(&self.thresholds).evaluate(&QaContext {
            networks: &networks,
            page: Some(page),
            tables: &earthwork_tables,
            measured: options.measured,
        });
        let qa_summary = QaEngine::summarize(&violations);

        let diagnostics = Diagnostics {
            ft_per_unit: calibration.ft_per_unit(),
            scale_source: calibration.scale_source().to_string(),
            color_tolerance: palette.tolerance(),
            snap_tolerance: merger.tolerance(),
            classified_lines: classification.line_count(),
            classified_areas: classification.area_count(),
            merged_lines: merged.line_count(),
            legend_rules: legend_rules.len(),
            notes: calibration.notes().to_vec(),
        };

        info!(
            resolved = calibration.is_resolved(),
            networks_count = networks.len(),
            tables_count = earthwork_tables.len(),
            violations_count = violations.len();
            "Takeoff finished"
        );

        Ok(TakeoffReport {
            overlay: Overlay::from_classification(&merged, &palette),
            calibration,
            quantities,
            diagnostics,
            networks,
            network_summaries,
            earthwork_tables,
            violations,
            qa_summary,
        })
    }

    /// Writes the report overlay as SVG.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Export`] when the overlay is empty or the file
    /// cannot be written.
    pub fn export_overlay(&self, report: &TakeoffReport, path: &Path) -> Result<(), TakeoffError> {
        let exporter = OverlayExporter::new(&path.to_string_lossy());
        exporter.export_overlay(&report.overlay)?;
        Ok(())
    }

    /// Writes the report violations as JSON; returns `false` on failure.
    pub fn export_violations(&self, report: &TakeoffReport, path: &Path) -> bool {
        QaEngine::export(&report.violations, path)
    }
}
