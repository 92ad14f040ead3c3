//! # Takeoff Parser
//!
//! Text-level parsing for civil drawing takeoff: station references, scale
//! labels, pipe and structure labels, and earthwork schedules laid out as
//! positioned text.
//!
//! ## Usage
//!
//! ```
//! # use takeoff_core::{element::TextElement, geometry::Point};
//! # use takeoff_parser::EarthworkParser;
//! let texts = vec![
//!     TextElement::at("EARTHWORK SUMMARY", Point::new(100.0, 500.0)),
//!     TextElement::at("STA 1+00 TO 2+00  150 CY  20 CY", Point::new(120.0, 480.0)),
//! ];
//!
//! let tables = EarthworkParser::default().parse(&texts);
//! assert_eq!(tables[0].total_cut_yd3, 150.0);
//! assert_eq!(tables[0].total_net_yd3, 130.0);
//! ```

pub mod earthwork;
mod error;
pub mod label;
pub mod scale;
pub mod station;

pub use earthwork::{EarthworkOptions, EarthworkParser};
pub use error::ParseError;
