//! Semantic categories assigned to classified drawing features.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Semantic category of a classified feature.
///
/// Linear categories (utilities, curb) are measured as lengths; area
/// categories (building, pavement, sidewalk) are measured as ring areas.
/// Unknown names from configuration are preserved as [`Category::Other`] and
/// treated as linear.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Water,
    /// Sanitary sewer.
    Sewer,
    Storm,
    Gas,
    Electric,
    Telecom,
    Curb,
    Building,
    Pavement,
    Sidewalk,
    Other(String),
}

impl Category {
    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Water => "water",
            Category::Sewer => "sewer",
            Category::Storm => "storm",
            Category::Gas => "gas",
            Category::Electric => "electric",
            Category::Telecom => "telecom",
            Category::Curb => "curb",
            Category::Building => "building",
            Category::Pavement => "pavement",
            Category::Sidewalk => "sidewalk",
            Category::Other(name) => name,
        }
    }

    /// Returns true for categories measured as filled areas.
    pub fn is_area(&self) -> bool {
        matches!(
            self,
            Category::Building | Category::Pavement | Category::Sidewalk
        )
    }

    /// Returns true for categories that form utility networks.
    pub fn is_utility(&self) -> bool {
        matches!(
            self,
            Category::Water
                | Category::Sewer
                | Category::Storm
                | Category::Gas
                | Category::Electric
                | Category::Telecom
        )
    }

    /// Returns true for gravity-flow utilities, whose pipes are checked for slope.
    pub fn is_gravity(&self) -> bool {
        matches!(self, Category::Sewer | Category::Storm)
    }
}

impl FromStr for Category {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "water" => Category::Water,
            "sewer" | "sanitary" | "sanitary_sewer" => Category::Sewer,
            "storm" | "storm_drain" => Category::Storm,
            "gas" => Category::Gas,
            "electric" | "electrical" => Category::Electric,
            "telecom" | "communication" => Category::Telecom,
            "curb" => Category::Curb,
            "building" => Category::Building,
            "pavement" | "paving" => Category::Pavement,
            "sidewalk" => Category::Sidewalk,
            _ => Category::Other(normalized),
        })
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match Category::from_str(&value) {
            Ok(category) => category,
            Err(never) => match never {},
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
