//! Color handling for drawing primitives and palettes.
//!
//! This module provides the [`Color`] type. Page documents carry stroke and
//! fill colors as unit-range component arrays (`[r, g, b]` or `[r, g, b, a]`),
//! while configuration documents use CSS color strings; both decode into the
//! same type. CSS parsing is delegated to the `DynamicColor` type from the
//! color crate.

use std::{fmt, str::FromStr};

use color::{DynamicColor, Srgb};
use serde::{Deserialize, Serialize};

/// An sRGB color with unit-range components.
///
/// Distances between colors are measured in 0–255 channel space so that
/// tolerances read the same way designers specify hex colors.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color {
    components: [f32; 4],
}

/// Accepted serialized forms of a [`Color`].
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Css(String),
    Components(Vec<f32>),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Css(s) => Color::new(&s),
            ColorRepr::Components(c) => match c.as_slice() {
                [r, g, b] => Ok(Color::from_unit_rgba(*r, *g, *b, 1.0)),
                [r, g, b, a] => Ok(Color::from_unit_rgba(*r, *g, *b, *a)),
                _ => Err(format!(
                    "color arrays need 3 or 4 components, got {}",
                    c.len()
                )),
            },
        }
    }
}

impl Color {
    /// Create a new `Color` from a string
    /// This will parse CSS color strings such as "#ff0000", "rgb(255, 0, 0)", "red", etc.
    ///
    /// # Examples
    ///
    /// ```
    /// use takeoff_core::color::Color;
    ///
    /// let water = Color::new("#0000ff").unwrap();
    /// let black = Color::new("black").unwrap();
    /// assert!(black.is_near_black(50.0));
    /// assert!(!water.is_near_black(50.0));
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self {
                components: color.to_alpha_color::<Srgb>().components,
            }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Creates a color from unit-range components, clamping each to `0.0..=1.0`.
    pub fn from_unit_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            components: [
                r.clamp(0.0, 1.0),
                g.clamp(0.0, 1.0),
                b.clamp(0.0, 1.0),
                a.clamp(0.0, 1.0),
            ],
        }
    }

    /// Creates an opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_unit_rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Returns the red, green and blue channels scaled to `0.0..=255.0`.
    pub fn rgb255(&self) -> [f64; 3] {
        let [r, g, b, _] = self.components;
        [
            f64::from(r) * 255.0,
            f64::from(g) * 255.0,
            f64::from(b) * 255.0,
        ]
    }

    /// Euclidean RGB distance to another color in 0–255 channel space.
    ///
    /// Alpha does not participate.
    pub fn distance(&self, other: &Color) -> f64 {
        let [r1, g1, b1] = self.rgb255();
        let [r2, g2, b2] = other.rgb255();
        ((r1 - r2).powi(2) + (g1 - g2).powi(2) + (b1 - b2).powi(2)).sqrt()
    }

    /// Returns true when every channel is at or below `threshold` (0–255 space).
    pub fn is_near_black(&self, threshold: f64) -> bool {
        self.rgb255().iter().all(|c| *c <= threshold)
    }

    /// Returns the alpha (transparency) component of this color.
    pub fn alpha(&self) -> f32 {
        self.components[3]
    }

    /// Creates a new color with the specified alpha value.
    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.components;
        Self::from_unit_rgba(r, g, b, alpha)
    }

    /// Returns the `#rrggbb` hex form of this color.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.rgb255();
        format!(
            "#{:02x}{:02x}{:02x}",
            r.round() as u8,
            g.round() as u8,
            b.round() as u8
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::from_rgb8(0, 0, 0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl From<&Color> for svg::node::Value {
    fn from(color: &Color) -> Self {
        Self::from(color.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_new() {
        let red = Color::new("#ff0000");
        assert!(red.is_ok());

        let invalid = Color::new("not-a-color");
        assert!(invalid.is_err());
    }

    #[test]
    fn test_color_hex_roundtrip() {
        let color = Color::new("#1a2b3c").unwrap();
        assert_eq!(color.to_hex(), "#1a2b3c");
        assert_eq!(color.to_string(), "#1a2b3c");
    }

    #[test]
    fn test_color_distance() {
        let black = Color::from_rgb8(0, 0, 0);
        let blue = Color::from_rgb8(0, 0, 255);
        let near_blue = Color::from_rgb8(0, 0, 240);

        assert!((black.distance(&blue) - 255.0).abs() < 1e-3);
        assert!((blue.distance(&near_blue) - 15.0).abs() < 1e-3);
        assert_eq!(blue.distance(&blue), 0.0);
    }

    #[test]
    fn test_color_distance_ignores_alpha() {
        let opaque = Color::from_rgb8(10, 20, 30);
        let faded = opaque.with_alpha(0.2);
        assert_eq!(opaque.distance(&faded), 0.0);
        assert!((faded.alpha() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_is_near_black() {
        assert!(Color::from_rgb8(20, 20, 20).is_near_black(50.0));
        assert!(!Color::from_rgb8(20, 90, 20).is_near_black(50.0));
    }

    #[test]
    fn test_deserialize_components_and_css() {
        let from_array: Color = serde_json::from_str("[0.0, 0.0, 1.0]").unwrap();
        assert_eq!(from_array.to_hex(), "#0000ff");

        let from_rgba: Color = serde_json::from_str("[1.0, 0.0, 0.0, 0.5]").unwrap();
        assert!((from_rgba.alpha() - 0.5).abs() < 1e-6);

        let from_css: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(from_css.to_hex(), "#00ff00");

        let bad: Result<Color, _> = serde_json::from_str("[1.0, 0.0]");
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_as_hex() {
        let color = Color::from_rgb8(255, 128, 0);
        assert_eq!(serde_json::to_string(&color).unwrap(), "\"#ff8000\"");
    }
}
