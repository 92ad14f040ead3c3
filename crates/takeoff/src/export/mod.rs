pub mod svg;

use crate::report::Overlay;

/// Writes a classified overlay somewhere.
pub trait Exporter {
    fn export_overlay(&self, overlay: &Overlay) -> Result<(), Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_io_error_keeps_source() {
        let err = Error::Io(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "I/O error: disk full");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_render_error_has_no_source() {
        let err = Error::Render("empty overlay".to_string());
        assert_eq!(err.to_string(), "Render error: empty overlay");
        assert!(err.source().is_none());
    }
}
