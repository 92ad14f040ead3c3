//! Takeoff CLI library
//!
//! This module contains the core CLI logic for the takeoff tool.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::{fs, path::Path};

use log::{info, warn};

use takeoff::{RunOptions, TakeoffBuilder, TakeoffError, source::JsonDocument};
use takeoff_core::quantity::MeasuredEarthwork;

/// Run the takeoff CLI application
///
/// This function loads the drawing document, runs the takeoff pipeline on
/// the selected page, and writes the JSON report plus any requested overlay
/// and violation files.
///
/// # Errors
///
/// Returns `TakeoffError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Unreadable documents or missing pages
/// - An invalid manual scale
/// - Overlay export errors
pub fn run(args: &Args) -> Result<(), TakeoffError> {
    info!(
        input_path = args.input,
        page = args.page,
        output_path = args.output;
        "Processing drawing"
    );

    let app_config = config::load_config(args.config.as_ref())?;
    let thresholds = config::load_thresholds(args.qa_config.as_ref());

    let document = JsonDocument::open(Path::new(&args.input))?;

    let measured = (args.measured_cut.is_some() || args.measured_fill.is_some()).then_some(
        MeasuredEarthwork {
            cut_cy: args.measured_cut,
            fill_cy: args.measured_fill,
        },
    );
    let options = RunOptions {
        manual_scale: args.scale,
        legend_pages: args.legend_pages.clone(),
        sibling_pages: args.sheets.clone(),
        measured,
        ..RunOptions::default()
    };

    let builder = TakeoffBuilder::new(app_config).with_thresholds(thresholds);
    let report = builder.run(&document, args.page, &options)?;

    let json = report
        .to_json()
        .map_err(|err| TakeoffError::Export(Box::new(err)))?;
    fs::write(&args.output, json)?;
    info!(output_file = args.output; "Report written");

    if let Some(overlay) = &args.overlay {
        if report.overlay.is_empty() {
            warn!(output_file = overlay; "Nothing classified, overlay not written");
        } else {
            builder.export_overlay(&report, Path::new(overlay))?;
            info!(output_file = overlay; "Overlay exported successfully");
        }
    }

    if let Some(violations) = &args.violations {
        if builder.export_violations(&report, Path::new(violations)) {
            info!(output_file = violations; "Violations exported successfully");
        } else {
            warn!(output_file = violations; "Violations could not be exported");
        }
    }

    if !report.calibration.is_resolved() {
        warn!("Scale could not be determined; pass --scale to get quantities");
    }
    info!(
        errors = report.qa_summary.errors,
        warnings = report.qa_summary.warnings;
        "QA finished"
    );

    Ok(())
}
