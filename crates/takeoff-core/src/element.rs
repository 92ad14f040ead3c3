//! Raw page primitives as delivered by a geometry source.
//!
//! A [`PageSnapshot`] is the immutable input of one pipeline invocation: the
//! ordered vector elements and text elements of a single drawing page.

use std::borrow::Cow;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    color::Color,
    geometry::{Bounds, Point, polyline_length, polyline_midpoint},
};

/// Geometric kind of a vector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    #[default]
    Line,
    Polygon,
}

/// A stroked and/or filled vector primitive in page space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorElement {
    #[serde(default)]
    pub kind: ElementKind,
    pub points: Vec<Point>,
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default)]
    pub fill: Option<Color>,
    #[serde(default)]
    pub width: f64,
    /// Optional content-group (layer) names the element belongs to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<String>,
    /// Optional affine transform `[a, b, c, d, e, f]` applied to `points`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f64; 6]>,
}

impl VectorElement {
    /// Creates a stroked line element.
    pub fn line(points: Vec<Point>, stroke: Color, width: f64) -> Self {
        Self {
            kind: ElementKind::Line,
            points,
            stroke: Some(stroke),
            width,
            ..Self::default()
        }
    }

    /// Creates a filled polygon element.
    pub fn polygon(points: Vec<Point>, fill: Color) -> Self {
        Self {
            kind: ElementKind::Polygon,
            points,
            fill: Some(fill),
            ..Self::default()
        }
    }

    /// Adds a layer name, builder style.
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layers.push(layer.into());
        self
    }

    /// Sets the affine transform, builder style.
    pub fn with_transform(mut self, transform: [f64; 6]) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Returns the points in page space, with the transform applied if present.
    pub fn page_points(&self) -> Cow<'_, [Point]> {
        match self.transform {
            Some(matrix) => Cow::Owned(self.points.iter().map(|p| p.transform(matrix)).collect()),
            None => Cow::Borrowed(&self.points),
        }
    }

    /// Total polyline length in page units.
    pub fn length(&self) -> f64 {
        polyline_length(&self.page_points())
    }

    /// Arc-length midpoint of the element.
    pub fn midpoint(&self) -> Option<Point> {
        polyline_midpoint(&self.page_points())
    }

    /// Bounding box of the element in page space.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.page_points())
    }

    /// First and last page-space points.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        let points = self.page_points();
        Some((*points.first()?, *points.last()?))
    }

    /// Returns true if any layer name contains `needle` (case-insensitive).
    pub fn in_layer_matching(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.layers
            .iter()
            .any(|layer| layer.to_ascii_lowercase().contains(&needle))
    }
}

/// A positioned run of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub text: String,
    pub bounds: Bounds,
}

impl TextElement {
    pub fn new(text: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }

    /// Creates a text element with a small box centered on `center`.
    ///
    /// Mostly useful for tests and synthetic pages.
    pub fn at(text: impl Into<String>, center: Point) -> Self {
        let text = text.into();
        let half_width = (text.chars().count() as f64 * 3.0).max(1.0);
        let bounds = Bounds::new(
            center.x() - half_width,
            center.y() - 4.0,
            center.x() + half_width,
            center.y() + 4.0,
        );
        Self { text, bounds }
    }

    /// Center of the text box.
    pub fn center(&self) -> Point {
        self.bounds.center()
    }
}

/// Coordinate convention of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Drawing convention: origin bottom-left, y grows upward.
    #[default]
    PageYUp,
    /// Raster convention: origin top-left, y grows downward.
    PixelYDown,
}

/// All primitives of one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub space: CoordinateSpace,
    /// Page height, used to flip pixel-space snapshots.
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub vectors: Vec<VectorElement>,
    #[serde(default)]
    pub texts: Vec<TextElement>,
}

impl PageSnapshot {
    pub fn new(vectors: Vec<VectorElement>, texts: Vec<TextElement>) -> Self {
        Self {
            space: CoordinateSpace::PageYUp,
            height: None,
            vectors,
            texts,
        }
    }

    /// Returns true when the page has no primitives at all.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty() && self.texts.is_empty()
    }

    /// Bounding box of every vector and text primitive.
    pub fn content_bounds(&self) -> Option<Bounds> {
        let vectors = self.vectors.iter().filter_map(VectorElement::bounds);
        let texts = self.texts.iter().map(|t| t.bounds);
        vectors.chain(texts).reduce(|acc, b| acc.merge(&b))
    }

    /// Converts the snapshot into y-up page space.
    ///
    /// Pixel-space snapshots are mirrored about the page height (or, when no
    /// height is declared, about the top of the content). Transforms are
    /// baked into the points so that the mirror applies to final positions.
    pub fn into_page_space(self) -> Self {
        if self.space == CoordinateSpace::PageYUp {
            return self;
        }

        let height = self
            .height
            .or_else(|| self.content_bounds().map(|b| b.max_y()))
            .unwrap_or(0.0);
        debug!(height; "Flipping pixel-space snapshot into page space");
        let flip = |p: Point| p.with_y(height - p.y());

        let vectors = self
            .vectors
            .into_iter()
            .map(|element| {
                let points = element.page_points().iter().map(|p| flip(*p)).collect();
                VectorElement {
                    points,
                    transform: None,
                    ..element
                }
            })
            .collect();
        let texts = self
            .texts
            .into_iter()
            .map(|text| {
                let b = text.bounds;
                TextElement {
                    bounds: Bounds::new(
                        b.min_x(),
                        height - b.max_y(),
                        b.max_x(),
                        height - b.min_y(),
                    ),
                    ..text
                }
            })
            .collect();

        Self {
            space: CoordinateSpace::PageYUp,
            height: Some(height),
            vectors,
            texts,
        }
    }
}
