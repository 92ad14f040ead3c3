use std::{fs::File, io::Write};

use log::{debug, error, info};
use svg::{
    Document,
    node::element::{Group, Path, Polygon, Rectangle},
};

use takeoff_core::geometry::Point;

use crate::{
    export,
    report::{Overlay, OverlayLayer},
};

/// Margin around the overlay content, in page units.
const MARGIN: f64 = 20.0;

/// Stroke for categories without a palette color.
const FALLBACK_STROKE: &str = "#000000";

/// SVG exporter for classified overlays.
///
/// Page space is y-up while SVG is y-down, so every point is mirrored about
/// the top of the content.
pub struct OverlayExporter {
    pub file_name: String,
}

impl OverlayExporter {
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
        }
    }

    /// Renders the overlay into an SVG document.
    pub fn render(&self, overlay: &Overlay) -> Result<Document, export::Error> {
        let Some(bounds) = overlay.bounds() else {
            return Err(export::Error::Render("overlay has no geometry".to_string()));
        };
        let width = bounds.width() + MARGIN * 2.0;
        let height = bounds.height() + MARGIN * 2.0;
        debug!(width, height; "Overlay SVG dimensions");

        let to_svg = |p: &Point| (p.x() - bounds.min_x() + MARGIN, bounds.max_y() - p.y() + MARGIN);

        let mut document = Document::new()
            .set("viewBox", format!("0 0 {width} {height}"))
            .set("width", width)
            .set("height", height)
            .add(
                Rectangle::new()
                    .set("width", "100%")
                    .set("height", "100%")
                    .set("fill", "white"),
            );

        for (category, layer) in &overlay.layers {
            let mut group = Group::new().set("id", category.as_str());
            for ring in &layer.rings {
                group = group.add(render_ring(ring, layer, &to_svg));
            }
            for line in layer.lines.iter().filter(|line| line.len() >= 2) {
                group = group.add(render_line(line, layer, &to_svg));
            }
            document = document.add(group);
        }

        Ok(document)
    }

    /// Writes an SVG document to the specified file
    pub fn write_document(&self, doc: Document) -> Result<(), export::Error> {
        info!(file_name = self.file_name; "Creating SVG file");
        let f = match File::create(&self.file_name) {
            Ok(file) => file,
            Err(err) => {
                error!(file_name = self.file_name, err:err; "Failed to create SVG file");
                return Err(export::Error::Io(err));
            }
        };

        if let Err(err) = write!(&f, "{doc}") {
            error!(file_name = self.file_name, err:err; "Failed to write SVG content");
            return Err(export::Error::Io(err));
        }

        Ok(())
    }
}

fn stroke_of(layer: &OverlayLayer) -> svg::node::Value {
    match &layer.color {
        Some(color) => color.into(),
        None => FALLBACK_STROKE.into(),
    }
}

fn render_ring(ring: &[Point], layer: &OverlayLayer, to_svg: &impl Fn(&Point) -> (f64, f64)) -> Polygon {
    let points = ring
        .iter()
        .map(|p| {
            let (x, y) = to_svg(p);
            format!("{x},{y}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    Polygon::new()
        .set("points", points)
        .set("fill", stroke_of(layer))
        .set("fill-opacity", 0.4)
        .set("stroke", stroke_of(layer))
        .set("stroke-width", 1)
}

fn render_line(line: &[Point], layer: &OverlayLayer, to_svg: &impl Fn(&Point) -> (f64, f64)) -> Path {
    let data = line
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let (x, y) = to_svg(p);
            let command = if idx == 0 { "M" } else { "L" };
            format!("{command} {x} {y}")
        })
        .collect::<Vec<_>>()
        .join(" ");
    Path::new()
        .set("d", data)
        .set("fill", "none")
        .set("stroke", stroke_of(layer))
        .set("stroke-width", 2)
        .set("stroke-linecap", "round")
}

impl export::Exporter for OverlayExporter {
    fn export_overlay(&self, overlay: &Overlay) -> Result<(), export::Error> {
        let doc = self.render(overlay)?;
        debug!("SVG document rendered");

        self.write_document(doc)
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::{category::Category, color::Color};

    use super::*;
    use crate::export::Exporter;

    fn overlay() -> Overlay {
        let mut overlay = Overlay::default();
        overlay.layers.insert(
            Category::Sewer,
            OverlayLayer {
                color: Some(Color::from_rgb8(0, 128, 0)),
                lines: vec![vec![Point::new(0.0, 0.0), Point::new(100.0, 50.0)]],
                rings: vec![],
            },
        );
        overlay.layers.insert(
            Category::Building,
            OverlayLayer {
                color: None,
                lines: vec![],
                rings: vec![vec![
                    Point::new(10.0, 10.0),
                    Point::new(30.0, 10.0),
                    Point::new(30.0, 30.0),
                ]],
            },
        );
        overlay
    }

    #[test]
    fn test_render_flips_y_and_colors_layers() {
        let doc = OverlayExporter::new("unused.svg").render(&overlay()).unwrap();
        let text = doc.to_string();
        assert!(text.contains("id=\"sewer\""));
        assert!(text.contains("id=\"building\""));
        assert!(text.contains("#008000"));
        // (0, 0) is the bottom-left of the content, so it lands at the bottom margin.
        assert!(text.contains("M 20 70 L 120 20"));
        assert!(text.contains("30,60"));
    }

    #[test]
    fn test_render_empty_overlay_fails() {
        let result = OverlayExporter::new("unused.svg").render(&Overlay::default());
        assert!(matches!(result, Err(export::Error::Render(_))));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.svg");
        let exporter = OverlayExporter::new(path.to_str().unwrap());
        exporter.export_overlay(&overlay()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<svg"));
    }

    #[test]
    fn test_export_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("overlay.svg");
        let exporter = OverlayExporter::new(path.to_str().unwrap());
        let err = exporter.export_overlay(&overlay()).unwrap_err();
        assert!(matches!(err, export::Error::Io(_)));
    }
}
