//! Takeoff Core Types and Definitions
//!
//! This crate provides the foundational value types shared by every stage of
//! the takeoff pipeline. It includes:
//!
//! - **Geometry**: Page-space points, bounds and ring/polyline math ([`geometry`] module)
//! - **Colors**: Stroke/fill colors with CSS parsing and RGB distance ([`color::Color`])
//! - **Elements**: Raw page primitives and snapshots ([`element`] module)
//! - **Categories**: Semantic feature categories ([`category::Category`])
//! - **Features**: Classified features and measurement buckets ([`feature`] module)
//! - **Calibration**: Scale factors and their provenance ([`calibration`] module)
//! - **Quantities**: Measured lengths, areas and volumes ([`quantity`] module)
//! - **Networks**: Utility node/edge models ([`network`] module)
//! - **Earthwork**: Cut/fill schedule tables ([`earthwork`] module)
//! - **QA**: Rules, violations and severities ([`qa`] module)
//!
//! Every type here is a plain value with no I/O, safe to serialize.

pub mod calibration;
pub mod category;
pub mod color;
pub mod earthwork;
pub mod element;
pub mod feature;
pub mod geometry;
pub mod network;
pub mod qa;
pub mod quantity;
