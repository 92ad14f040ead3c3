//! Utility network assembly.
//!
//! The [`NetworkBuilder`] turns merged utility polylines into a [`Network`]
//! per category:
//!
//! - polyline endpoints closer than `node_snap_tolerance` share a node;
//! - a polyline is split at interior vertices with a structure label near
//!   them, so manholes between two runs stay nodes;
//! - structure labels near a node (`MH`, `CB`, `VALVE`, ...) give its type,
//!   rim and invert; unlabeled nodes are typed by degree;
//! - pipe labels near an edge give diameter, material and slope;
//! - without a slope label, gravity slope is derived from end-node inverts;
//! - gravity edges point downhill, from the higher invert to the lower one.
//!
//! Lookups over the result live in [`Topology`].

mod topology;

pub use topology::{NetworkSummary, Topology};

use log::{debug, info, trace, warn};

use takeoff_core::{
    category::Category,
    element::TextElement,
    feature::ClassifiedFeature,
    geometry::{Point, polyline_length, polyline_midpoint},
    network::{AttributeValue, Attributes, Edge, EdgeType, Network, Node, NodeType},
};
use takeoff_parser::label::{
    PipeLabel, StructureLabel, parse_pipe_label, parse_structure_label, structure_type,
};

use crate::{classify::Classification, config::NetworkConfig};

/// Builds utility networks from merged, classified lines.
#[derive(Debug, Clone)]
pub struct NetworkBuilder<'a> {
    config: &'a NetworkConfig,
    ft_per_unit: Option<f64>,
}

impl<'a> NetworkBuilder<'a> {
    pub fn new(config: &'a NetworkConfig) -> Self {
        Self {
            config,
            ft_per_unit: None,
        }
    }

    /// Sets the calibration used for edge lengths and invert-derived slopes.
    pub fn with_scale(mut self, ft_per_unit: Option<f64>) -> Self {
        self.ft_per_unit = ft_per_unit.filter(|f| f.is_finite() && *f > 0.0);
        self
    }

    /// Builds one network per utility category present in `merged`.
    pub fn build_all(&self, merged: &Classification, texts: &[TextElement]) -> Vec<Network> {
        let networks: Vec<Network> = merged
            .lines
            .iter()
            .filter(|(category, features)| category.is_utility() && !features.is_empty())
            .map(|(category, features)| self.build(category, features, texts))
            .collect();
        info!(networks_count = networks.len(); "Networks assembled");
        networks
    }

    /// Builds the network of one category.
    ///
    /// # Examples
    ///
    /// ```
    /// # use takeoff::{config::NetworkConfig, network::NetworkBuilder};
    /// # use takeoff_core::{category::Category, feature::ClassifiedFeature, geometry::Point};
    /// let config = NetworkConfig::default();
    /// let run = |x0: f64, x1: f64| {
    ///     ClassifiedFeature::new(Category::Water, vec![Point::new(x0, 0.0), Point::new(x1, 0.0)], 1.0)
    /// };
    ///
    /// let network = NetworkBuilder::new(&config).build(&Category::Water, &[run(0.0, 100.0), run(100.0, 250.0)], &[]);
    /// assert_eq!(network.nodes.len(), 3);
    /// assert_eq!(network.edges.len(), 2);
    /// assert_eq!(network.incident_edges("water-n2").count(), 2);
    /// ```
    pub fn build(
        &self,
        category: &Category,
        features: &[ClassifiedFeature],
        texts: &[TextElement],
    ) -> Network {
        let prefix = category.as_str();
        let mut network = Network::new(prefix, format!("{category} network"), category.clone());

        let pieces: Vec<ClassifiedFeature> = features
            .iter()
            .flat_map(|feature| self.split_at_structures(feature, texts))
            .collect();

        let mut positions: Vec<Point> = Vec::new();
        let mut runs: Vec<(usize, usize, &ClassifiedFeature)> = Vec::new();
        for feature in &pieces {
            let (Some(first), Some(last)) = (feature.points.first(), feature.points.last()) else {
                continue;
            };
            if feature.points.len() < 2 {
                continue;
            }
            let from = self.node_at(&mut positions, *first);
            let to = self.node_at(&mut positions, *last);
            runs.push((from, to, feature));
        }

        let mut degrees = vec![0usize; positions.len()];
        for (from, to, _) in &runs {
            degrees[*from] += 1;
            degrees[*to] += 1;
        }

        for (idx, position) in positions.iter().enumerate() {
            let node = self.node(format!("{prefix}-n{}", idx + 1), *position, degrees[idx], texts);
            network.add_node(node);
        }

        for (idx, (from, to, feature)) in runs.into_iter().enumerate() {
            let edge = self.edge(
                format!("{prefix}-e{}", idx + 1),
                category,
                (&network.nodes[from], &network.nodes[to]),
                feature,
                texts,
            );
            network.add_edge(edge);
        }

        debug!(
            category:% = category,
            nodes_count = network.nodes.len(),
            edges_count = network.edges.len();
            "Network built"
        );
        network
    }

    /// Splits a merged polyline at interior vertices that carry a structure
    /// label, so every labeled structure becomes a node.
    fn split_at_structures(
        &self,
        feature: &ClassifiedFeature,
        texts: &[TextElement],
    ) -> Vec<ClassifiedFeature> {
        let points = &feature.points;
        let mut pieces = Vec::new();
        let mut start = 0;
        for idx in 1..points.len().saturating_sub(1) {
            let is_structure = self
                .texts_near(texts, points[idx])
                .iter()
                .any(|text| structure_type(&text.text).is_some());
            if is_structure {
                let mut piece = feature.clone();
                piece.points = points[start..=idx].to_vec();
                pieces.push(piece);
                start = idx;
            }
        }
        if start == 0 {
            return vec![feature.clone()];
        }
        let mut last = feature.clone();
        last.points = points[start..].to_vec();
        pieces.push(last);
        trace!(pieces = pieces.len(); "Polyline split at structures");
        pieces
    }

    /// Index of the node at `point`, creating it when no node is close enough.
    fn node_at(&self, positions: &mut Vec<Point>, point: Point) -> usize {
        let limit = self.config.node_snap_tolerance * self.config.node_snap_tolerance;
        match positions.iter().position(|p| p.distance_squared(point) <= limit) {
            Some(idx) => idx,
            None => {
                positions.push(point);
                positions.len() - 1
            }
        }
    }

    fn node(&self, id: String, position: Point, degree: usize, texts: &[TextElement]) -> Node {
        let mut label = StructureLabel::default();
        let mut source = None;
        for text in self.texts_near(texts, position) {
            let found = parse_structure_label(&text.text);
            if label.node_type.is_none() && found.node_type.is_some() {
                source = Some(text.text.clone());
            }
            label.node_type = label.node_type.or(found.node_type);
            label.rim_elevation = label.rim_elevation.or(found.rim_elevation);
            if label.inverts.is_empty() {
                label.inverts = found.inverts;
            }
        }

        let node_type = label.node_type.unwrap_or(match degree {
            1 => NodeType::Terminal,
            d if d >= 3 => NodeType::Junction,
            _ => NodeType::Unknown,
        });
        let mut node = Node::new(id, node_type, position.x(), position.y());
        node.rim_elevation = label.rim_elevation;
        node.invert_elevation = label.lowest_invert();
        set_attribute(&mut node.attributes, "degree", degree as i64);
        if let Some(source) = source {
            set_attribute(&mut node.attributes, "label", source);
        }
        node
    }

    fn edge(
        &self,
        id: String,
        category: &Category,
        (start, end): (&Node, &Node),
        feature: &ClassifiedFeature,
        texts: &[TextElement],
    ) -> Edge {
        let mut label = PipeLabel::default();
        if let Some(midpoint) = polyline_midpoint(&feature.points) {
            for text in self.texts_near(texts, midpoint) {
                label.merge(parse_pipe_label(&text.text));
            }
        }

        let length_ft = self.ft_per_unit.map(|f| polyline_length(&feature.points) * f);
        let mut points = feature.points.clone();
        let (mut from, mut to) = (start, end);
        if category.is_gravity() {
            if let (Some(a), Some(b)) = (start.invert_elevation, end.invert_elevation) {
                if a < b {
                    (from, to) = (end, start);
                    points.reverse();
                }
            }
        }

        let mut edge = Edge::new(id, EdgeType::for_category(category), &from.id, &to.id);
        edge.points = points;
        edge.diameter_in = feature.diameter_in.or(label.diameter_in);
        edge.material = feature.material.clone().or(label.material);
        edge.length_ft = length_ft;

        let depths: Vec<f64> = [from.depth(), to.depth()].into_iter().flatten().collect();
        if !depths.is_empty() {
            edge.avg_depth_ft = Some(depths.iter().sum::<f64>() / depths.len() as f64);
        }

        if let Some(percent) = label.slope_percent {
            edge = edge.with_slope_percent(percent);
            set_attribute(&mut edge.attributes, "slope_source", "label");
        } else if let (Some(a), Some(b), Some(length)) =
            (from.invert_elevation, to.invert_elevation, length_ft)
        {
            if length > 0.0 {
                edge.slope = Some((a - b).abs() / length);
                set_attribute(&mut edge.attributes, "slope_source", "inverts");
            }
        }

        set_attribute(&mut edge.attributes, "category", category.as_str());
        set_attribute(&mut edge.attributes, "confidence", feature.confidence);
        edge
    }

    /// Texts within the label radius of `anchor`, nearest first.
    fn texts_near<'t>(&self, texts: &'t [TextElement], anchor: Point) -> Vec<&'t TextElement> {
        let limit = self.config.label_radius * self.config.label_radius;
        let mut near: Vec<(f64, &TextElement)> = texts
            .iter()
            .map(|t| (t.center().distance_squared(anchor), t))
            .filter(|(d2, _)| *d2 <= limit)
            .collect();
        near.sort_by(|a, b| a.0.total_cmp(&b.0));
        near.into_iter().map(|(_, t)| t).collect()
    }
}

fn set_attribute(attributes: &mut Attributes, key: &str, value: impl Into<AttributeValue>) {
    if let Err(err) = attributes.insert(key, value) {
        warn!(key, err:%; "Attribute dropped");
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn check_inbound_is_subset_of_incident(segments: Vec<((i32, i32), (i32, i32))>) {
        let config = NetworkConfig::default();
        let features: Vec<ClassifiedFeature> = segments
            .into_iter()
            .map(|((x0, y0), (x1, y1))| {
                ClassifiedFeature::new(
                    Category::Sewer,
                    vec![
                        Point::new(f64::from(x0) * 10.0, f64::from(y0) * 10.0),
                        Point::new(f64::from(x1) * 10.0, f64::from(y1) * 10.0),
                    ],
                    1.0,
                )
            })
            .collect();
        let network = NetworkBuilder::new(&config).build(&Category::Sewer, &features, &[]);

        for node in &network.nodes {
            let incident: Vec<&str> = network.incident_edges(&node.id).map(|e| e.id.as_str()).collect();
            for edge in network.inbound_edges(&node.id) {
                assert!(incident.contains(&edge.id.as_str()));
            }
        }
    }

    proptest! {
        #[test]
        fn inbound_is_subset_of_incident(
            segments in prop::collection::vec(((0i32..5, 0i32..5), (0i32..5, 0i32..5)), 0..12)
        ) {
            check_inbound_is_subset_of_incident(segments);
        }
    }
}
