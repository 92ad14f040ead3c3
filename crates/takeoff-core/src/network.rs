//! Utility network model.
//!
//! A [`Network`] is a plain list of [`Node`]s and [`Edge`]s for one utility
//! system. Edge endpoints are logical id references: a network may contain
//! edges whose endpoints are missing, and nothing here rejects them.
//!
//! # Example
//!
//! ```
//! # use takeoff_core::network::{Edge, EdgeType, Network, Node, NodeType};
//! # use takeoff_core::category::Category;
//! let mut network = Network::new("sewer-1", "Sanitary", Category::Sewer);
//! network.add_node(Node::new("MH-1", NodeType::Manhole, 0.0, 0.0));
//! network.add_node(Node::new("MH-2", NodeType::Manhole, 100.0, 0.0));
//! network.add_edge(Edge::new("P-1", EdgeType::Pipe, "MH-1", "MH-2"));
//!
//! assert_eq!(network.incident_edges("MH-2").count(), 1);
//! assert_eq!(network.inbound_edges("MH-1").count(), 0);
//! assert!(network.node("MH-9").is_none());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{category::Category, geometry::Point};

/// Maximum number of entries in an extension attribute map.
pub const MAX_ATTRIBUTES: usize = 32;

/// Errors raised by the bounded attribute map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    #[error("attribute map is full ({MAX_ATTRIBUTES} entries); cannot add `{0}`")]
    Full(String),

    #[error("attribute keys must not be empty")]
    EmptyKey,
}

/// A scalar extension value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Bounded string → scalar extension map, ordered by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, AttributeValue>",
    into = "BTreeMap<String, AttributeValue>"
)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl TryFrom<BTreeMap<String, AttributeValue>> for Attributes {
    type Error = AttributeError;

    fn try_from(entries: BTreeMap<String, AttributeValue>) -> Result<Self, Self::Error> {
        let mut attributes = Self::new();
        for (key, value) in entries {
            attributes.insert(key, value)?;
        }
        Ok(attributes)
    }
}

impl From<Attributes> for BTreeMap<String, AttributeValue> {
    fn from(attributes: Attributes) -> Self {
        attributes.0
    }
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Full`] when adding a new key would exceed
    /// [`MAX_ATTRIBUTES`], and [`AttributeError::EmptyKey`] for blank keys.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), AttributeError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(AttributeError::EmptyKey);
        }
        if !self.0.contains_key(&key) && self.0.len() >= MAX_ATTRIBUTES {
            return Err(AttributeError::Full(key));
        }
        self.0.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }
}

/// Structure type of a network node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Manhole,
    CatchBasin,
    Inlet,
    Valve,
    Hydrant,
    Meter,
    Junction,
    Terminal,
    #[default]
    Unknown,
}

/// Conveyance type of a network edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    #[default]
    Pipe,
    Conduit,
    Cable,
    Duct,
}

impl EdgeType {
    /// Edge type conventionally used for a utility category.
    pub fn for_category(category: &Category) -> Self {
        match category {
            Category::Electric => EdgeType::Conduit,
            Category::Telecom => EdgeType::Cable,
            _ => EdgeType::Pipe,
        }
    }
}

/// A structure or vertex of a utility network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub diameter_in: Option<f64>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub invert_elevation: Option<f64>,
    #[serde(default)]
    pub rim_elevation: Option<f64>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            node_type,
            x,
            y,
            z: None,
            diameter_in: None,
            material: None,
            invert_elevation: None,
            rim_elevation: None,
            attributes: Attributes::new(),
        }
    }

    /// Planar position of the node.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Depth from rim to invert, when both elevations are known.
    pub fn depth(&self) -> Option<f64> {
        Some(self.rim_elevation? - self.invert_elevation?)
    }
}

/// A pipe, conduit, cable or duct run between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub from_node_id: String,
    pub to_node_id: String,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(default)]
    pub diameter_in: Option<f64>,
    #[serde(default)]
    pub material: Option<String>,
    /// Grade as a fraction (0.005 == 0.5%).
    #[serde(default)]
    pub slope: Option<f64>,
    #[serde(default)]
    pub avg_depth_ft: Option<f64>,
    #[serde(default)]
    pub length_ft: Option<f64>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        edge_type: EdgeType,
        from_node_id: impl Into<String>,
        to_node_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            edge_type,
            from_node_id: from_node_id.into(),
            to_node_id: to_node_id.into(),
            points: Vec::new(),
            diameter_in: None,
            material: None,
            slope: None,
            avg_depth_ft: None,
            length_ft: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the slope from a percentage, builder style.
    pub fn with_slope_percent(mut self, percent: f64) -> Self {
        self.slope = Some(percent / 100.0);
        self
    }

    /// Slope expressed as a percentage.
    pub fn slope_percent(&self) -> Option<f64> {
        self.slope.map(|s| s * 100.0)
    }

    /// Returns true if the node id is either endpoint.
    pub fn touches(&self, node_id: &str) -> bool {
        self.from_node_id == node_id || self.to_node_id == node_id
    }
}

/// A utility network for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Network {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Appends a node. Ids are not checked for uniqueness.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Appends an edge. Endpoint references are not checked.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Returns the first node with the given id, if any.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns the first edge with the given id, if any.
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// All edges touching the node, whichever endpoint it is.
    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Edges flowing into the node (`to_node_id == node_id`) only.
    pub fn inbound_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.to_node_id == node_id)
    }

    /// Serializes the network, attribute maps included, to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        // Every field is a plain value with a string-keyed map, so this cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuilds a network from [`Network::to_json`] output.
    ///
    /// # Errors
    ///
    /// Returns the deserialization error for values that do not describe a network.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_network() -> Network {
        let mut network = Network::new("storm-1", "Storm", Category::Storm);
        let mut cb = Node::new("CB-1", NodeType::CatchBasin, 0.0, 0.0);
        cb.rim_elevation = Some(105.0);
        cb.invert_elevation = Some(101.5);
        cb.attributes.insert("grate", "type C").unwrap();
        network.add_node(cb);
        network.add_node(Node::new("MH-1", NodeType::Manhole, 50.0, 0.0));
        network.add_node(Node::new("OUT", NodeType::Terminal, 90.0, 0.0));

        let mut p1 = Edge::new("P-1", EdgeType::Pipe, "CB-1", "MH-1").with_slope_percent(1.0);
        p1.diameter_in = Some(15.0);
        p1.material = Some("RCP".to_string());
        p1.points = vec![Point::new(0.0, 0.0), Point::new(50.0, 0.0)];
        p1.attributes.insert("label", "15\" RCP").unwrap();
        p1.attributes.insert("sheet", 3_i64).unwrap();
        network.add_edge(p1);
        network.add_edge(Edge::new("P-2", EdgeType::Pipe, "MH-1", "OUT"));
        network
    }

    #[test]
    fn test_lookup_returns_none_for_missing() {
        let network = sample_network();
        assert!(network.node("CB-1").is_some());
        assert!(network.node("nope").is_none());
        assert!(network.edge("P-2").is_some());
        assert!(network.edge("nope").is_none());
    }

    #[test]
    fn test_incident_vs_inbound() {
        let network = sample_network();

        let incident: Vec<_> = network.incident_edges("MH-1").map(|e| e.id.as_str()).collect();
        assert_eq!(incident, vec!["P-1", "P-2"]);

        let inbound: Vec<_> = network.inbound_edges("MH-1").map(|e| e.id.as_str()).collect();
        assert_eq!(inbound, vec!["P-1"]);

        assert_eq!(network.inbound_edges("CB-1").count(), 0);
        assert_eq!(network.incident_edges("CB-1").count(), 1);
    }

    #[test]
    fn test_dangling_references_are_allowed() {
        let mut network = Network::new("w", "Water", Category::Water);
        network.add_edge(Edge::new("E-1", EdgeType::Pipe, "ghost-a", "ghost-b"));
        assert_eq!(network.nodes.len(), 0);
        assert_eq!(network.edges.len(), 1);
        assert_eq!(network.inbound_edges("ghost-b").count(), 1);
    }

    #[test]
    fn test_json_roundtrip_preserves_attributes() {
        let network = sample_network();
        let value = network.to_json();
        assert_eq!(value["edges"][0]["attributes"]["sheet"], 3);
        assert_eq!(value["nodes"][0]["type"], "catch_basin");

        let back = Network::from_json(value).unwrap();
        assert_eq!(back, network);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Network::from_json(serde_json::json!({"id": 3})).is_err());
    }

    #[test]
    fn test_slope_percent() {
        let edge = Edge::new("e", EdgeType::Pipe, "a", "b").with_slope_percent(0.3);
        assert!((edge.slope.unwrap() - 0.003).abs() < 1e-12);
        assert!((edge.slope_percent().unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_node_depth() {
        let mut node = Node::new("MH", NodeType::Manhole, 0.0, 0.0);
        assert_eq!(node.depth(), None);
        node.rim_elevation = Some(110.0);
        node.invert_elevation = Some(102.0);
        assert_eq!(node.depth(), Some(8.0));
    }

    #[test]
    fn test_attributes_are_bounded() {
        let mut attributes = Attributes::new();
        for i in 0..MAX_ATTRIBUTES {
            attributes.insert(format!("k{i}"), i as i64).unwrap();
        }
        assert_eq!(
            attributes.insert("overflow", true),
            Err(AttributeError::Full("overflow".to_string()))
        );
        // Replacing an existing key is still allowed
        assert!(attributes.insert("k0", 1.5).is_ok());
        assert_eq!(attributes.get("k0"), Some(&AttributeValue::Float(1.5)));
        assert_eq!(attributes.insert(" ", 1.0), Err(AttributeError::EmptyKey));
    }

    #[test]
    fn test_from_json_enforces_attribute_bounds() {
        let mut value = sample_network().to_json();
        value["nodes"][0]["attributes"] = serde_json::json!({"": 1});
        let err = Network::from_json(value).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));

        let oversized: serde_json::Map<_, _> = (0..=MAX_ATTRIBUTES)
            .map(|i| (format!("k{i}"), serde_json::json!(i)))
            .collect();
        let mut value = sample_network().to_json();
        value["edges"][0]["attributes"] = serde_json::Value::Object(oversized);
        let err = Network::from_json(value).unwrap_err();
        assert!(err.to_string().contains("attribute map is full"));
    }

    #[test]
    fn test_edge_type_for_category() {
        assert_eq!(EdgeType::for_category(&Category::Electric), EdgeType::Conduit);
        assert_eq!(EdgeType::for_category(&Category::Telecom), EdgeType::Cable);
        assert_eq!(EdgeType::for_category(&Category::Sewer), EdgeType::Pipe);
    }
}
