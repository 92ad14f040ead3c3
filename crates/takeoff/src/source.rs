//! Geometry sources.
//!
//! A [`GeometrySource`] hands out one [`PageSnapshot`] per 0-based page
//! index. Every snapshot it returns is in y-up page space; adapters that read
//! raster-convention data convert before returning.
//!
//! [`JsonDocument`] is the bundled adapter. Its format is a list of pages,
//! each in the serde layout of [`PageSnapshot`]:
//!
//! ```json
//! {
//!   "pages": [
//!     {
//!       "space": "page_y_up",
//!       "vectors": [{"kind": "line", "points": [[0, 0], [100, 0]], "stroke": "#000000", "width": 3}],
//!       "texts": [{"text": "SCALE 100 ft", "bounds": {"min_x": 0, "min_y": 10, "max_x": 60, "max_y": 18}}]
//!     }
//!   ]
//! }
//! ```

use std::{fs, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use takeoff_core::element::PageSnapshot;

use crate::error::TakeoffError;

/// Supplies page snapshots by index.
pub trait GeometrySource {
    fn page_count(&self) -> usize;

    /// Returns page `index` in y-up page space.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Source`] when the page does not exist or
    /// cannot be read.
    fn page(&self, index: usize) -> Result<PageSnapshot, TakeoffError>;
}

/// A drawing set serialized as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonDocument {
    pages: Vec<PageSnapshot>,
}

impl JsonDocument {
    pub fn new(pages: Vec<PageSnapshot>) -> Self {
        Self { pages }
    }

    /// Parses a document.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Source`] describing the JSON error.
    pub fn from_json(source: &str) -> Result<Self, TakeoffError> {
        serde_json::from_str(source).map_err(|err| TakeoffError::Source(err.to_string()))
    }

    /// Reads and parses a document file.
    ///
    /// # Errors
    ///
    /// Returns [`TakeoffError::Io`] when the file cannot be read and
    /// [`TakeoffError::Source`] when it is not a valid document.
    pub fn open(path: &Path) -> Result<Self, TakeoffError> {
        let source = fs::read_to_string(path)?;
        let document = Self::from_json(&source)?;
        debug!(path:? = path, pages_count = document.pages.len(); "Document loaded");
        Ok(document)
    }
}

impl GeometrySource for JsonDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageSnapshot, TakeoffError> {
        self.pages
            .get(index)
            .cloned()
            .map(PageSnapshot::into_page_space)
            .ok_or_else(|| {
                TakeoffError::Source(format!(
                    "page {index} does not exist; the document has {} page(s)",
                    self.pages.len()
                ))
            })
    }
}
