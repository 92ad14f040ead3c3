//! Command-line argument definitions for the Takeoff CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the drawing page and its companion
//! sheets, override calibration, and name the report files to write.

use clap::Parser;

/// Command-line arguments for the takeoff tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input drawing document (JSON)
    #[arg(help = "Path to the input document")]
    pub input: String,

    /// 0-based index of the page to take off
    #[arg(short, long, default_value_t = 0)]
    pub page: usize,

    /// Pages holding the drawing legend (repeatable)
    #[arg(long = "legend-page")]
    pub legend_pages: Vec<usize>,

    /// Sibling sheets searched for earthwork schedules (repeatable)
    #[arg(long = "sheet")]
    pub sheets: Vec<usize>,

    /// Manual scale in feet per page unit; skips scale-bar detection
    #[arg(short, long)]
    pub scale: Option<f64>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to QA thresholds file (TOML)
    #[arg(long)]
    pub qa_config: Option<String>,

    /// Independently measured cut volume in cubic yards
    #[arg(long)]
    pub measured_cut: Option<f64>,

    /// Independently measured fill volume in cubic yards
    #[arg(long)]
    pub measured_fill: Option<f64>,

    /// Path to the output report (JSON)
    #[arg(short, long, default_value = "report.json")]
    pub output: String,

    /// Path to write the classified overlay (SVG)
    #[arg(long)]
    pub overlay: Option<String>,

    /// Path to write the QA violations (JSON)
    #[arg(long)]
    pub violations: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
