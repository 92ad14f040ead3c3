//! Adjacency index over an assembled [`Network`].
//!
//! A [`Network`] stores nodes and edges as flat lists with id references.
//! [`Topology`] indexes those references once so that traversal questions
//! (which edges flow into a structure, which structures have no inflow, how
//! many disconnected systems a sheet shows) do not rescan the edge list.
//!
//! Referential integrity is reported, never enforced: edges whose endpoints
//! are missing show up in [`Topology::dangling_edges`] and are otherwise
//! ignored.

use indexmap::IndexMap;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use takeoff_core::network::{Edge, Network, Node};

/// Counts describing one network, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub id: String,
    pub category: String,
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes without inbound edges.
    pub root_count: usize,
    /// Edges referencing at least one missing node.
    pub dangling_edge_count: usize,
    /// Connected components, counting isolated nodes.
    pub component_count: usize,
}

/// Incoming and outgoing edge indices per node id.
#[derive(Debug)]
pub struct Topology<'a> {
    network: &'a Network,
    nodes: IndexMap<&'a str, usize>,
    inbound: IndexMap<&'a str, Vec<usize>>,
    outbound: IndexMap<&'a str, Vec<usize>>,
}

impl<'a> Topology<'a> {
    /// Indexes `network`.
    ///
    /// When ids repeat, the first node with an id is the one indexed.
    pub fn new(network: &'a Network) -> Self {
        let mut nodes = IndexMap::new();
        for (idx, node) in network.nodes.iter().enumerate() {
            nodes.entry(node.id.as_str()).or_insert(idx);
        }

        let mut inbound: IndexMap<&str, Vec<usize>> = IndexMap::new();
        let mut outbound: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (idx, edge) in network.edges.iter().enumerate() {
            outbound.entry(edge.from_node_id.as_str()).or_default().push(idx);
            inbound.entry(edge.to_node_id.as_str()).or_default().push(idx);
        }

        Self {
            network,
            nodes,
            inbound,
            outbound,
        }
    }

    /// Edges whose `to_node_id` is `node_id`.
    pub fn inbound(&self, node_id: &str) -> impl Iterator<Item = &'a Edge> {
        self.edges_at(&self.inbound, node_id)
    }

    /// Edges whose `from_node_id` is `node_id`.
    pub fn outbound(&self, node_id: &str) -> impl Iterator<Item = &'a Edge> {
        self.edges_at(&self.outbound, node_id)
    }

    /// Edges touching `node_id` at either end, in edge order.
    ///
    /// A self-loop is listed once.
    pub fn incident(&self, node_id: &str) -> Vec<&'a Edge> {
        let mut indices: Vec<usize> = self
            .outbound
            .get(node_id)
            .into_iter()
            .chain(self.inbound.get(node_id))
            .flatten()
            .copied()
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|idx| &self.network.edges[idx]).collect()
    }

    /// Number of edge ends at `node_id`.
    pub fn degree(&self, node_id: &str) -> usize {
        let count = |index: &IndexMap<&str, Vec<usize>>| index.get(node_id).map_or(0, Vec::len);
        count(&self.inbound) + count(&self.outbound)
    }

    /// Nodes with no inbound edges, in node order.
    pub fn roots(&self) -> impl Iterator<Item = &'a Node> {
        let inbound = &self.inbound;
        self.network
            .nodes
            .iter()
            .filter(move |node| !inbound.contains_key(node.id.as_str()))
    }

    /// Edges with at least one endpoint that is not a node of the network.
    pub fn dangling_edges(&self) -> impl Iterator<Item = &'a Edge> {
        let nodes = &self.nodes;
        self.network.edges.iter().filter(move |edge| {
            !nodes.contains_key(edge.from_node_id.as_str())
                || !nodes.contains_key(edge.to_node_id.as_str())
        })
    }

    /// Number of connected components, ignoring edge direction.
    ///
    /// Isolated nodes are components of their own; dangling edges connect nothing.
    pub fn component_count(&self) -> usize {
        let mut components = UnionFind::<usize>::new(self.nodes.len());
        for edge in &self.network.edges {
            let from = self.nodes.get_index_of(edge.from_node_id.as_str());
            let to = self.nodes.get_index_of(edge.to_node_id.as_str());
            if let (Some(from), Some(to)) = (from, to) {
                components.union(from, to);
            }
        }

        let mut labels = components.into_labeling();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Counts for reports.
    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            id: self.network.id.clone(),
            category: self.network.category.to_string(),
            node_count: self.network.nodes.len(),
            edge_count: self.network.edges.len(),
            root_count: self.roots().count(),
            dangling_edge_count: self.dangling_edges().count(),
            component_count: self.component_count(),
        }
    }

    fn edges_at(
        &self,
        index: &IndexMap<&'a str, Vec<usize>>,
        node_id: &str,
    ) -> impl Iterator<Item = &'a Edge> {
        let edges = &self.network.edges;
        index
            .get(node_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(move |idx| &edges[idx])
    }
}

#[cfg(test)]
mod tests {
    use takeoff_core::{
        category::Category,
        network::{EdgeType, NodeType},
    };

    use super::*;

    fn sample() -> Network {
        let mut network = Network::new("sewer", "Sewer", Category::Sewer);
        for (id, x) in [("MH-1", 0.0), ("MH-2", 100.0), ("MH-3", 200.0), ("MH-9", 900.0)] {
            network.add_node(Node::new(id, NodeType::Manhole, x, 0.0));
        }
        network.add_edge(Edge::new("P-1", EdgeType::Pipe, "MH-1", "MH-2"));
        network.add_edge(Edge::new("P-2", EdgeType::Pipe, "MH-2", "MH-3"));
        network.add_edge(Edge::new("P-3", EdgeType::Pipe, "MH-3", "MH-404"));
        network
    }

    #[test]
    fn test_inbound_outbound_incident() {
        let network = sample();
        let topology = Topology::new(&network);

        let ids = |edges: Vec<&Edge>| edges.into_iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(topology.inbound("MH-2").collect()), ["P-1"]);
        assert_eq!(ids(topology.outbound("MH-2").collect()), ["P-2"]);
        assert_eq!(ids(topology.incident("MH-2")), ["P-1", "P-2"]);
        assert_eq!(topology.degree("MH-2"), 2);
        assert_eq!(topology.inbound("MH-1").count(), 0);
        assert_eq!(topology.incident("nope").len(), 0);
    }

    #[test]
    fn test_incident_matches_network_lookup() {
        let network = sample();
        let topology = Topology::new(&network);
        for node in &network.nodes {
            let from_index: Vec<&str> = topology.incident(&node.id).iter().map(|e| e.id.as_str()).collect();
            let from_scan: Vec<&str> = network.incident_edges(&node.id).map(|e| e.id.as_str()).collect();
            assert_eq!(from_index, from_scan);
        }
    }

    #[test]
    fn test_roots_dangling_and_components() {
        let network = sample();
        let topology = Topology::new(&network);

        let roots: Vec<&str> = topology.roots().map(|n| n.id.as_str()).collect();
        assert_eq!(roots, ["MH-1", "MH-9"]);

        let dangling: Vec<&str> = topology.dangling_edges().map(|e| e.id.as_str()).collect();
        assert_eq!(dangling, ["P-3"]);

        assert_eq!(topology.component_count(), 2);

        let summary = topology.summary();
        assert_eq!(summary.node_count, 4);
        assert_eq!(summary.edge_count, 3);
        assert_eq!(summary.root_count, 2);
        assert_eq!(summary.dangling_edge_count, 1);
        assert_eq!(summary.category, "sewer");
    }

    #[test]
    fn test_self_loop_listed_once() {
        let mut network = Network::new("water", "Water", Category::Water);
        network.add_node(Node::new("V-1", NodeType::Valve, 0.0, 0.0));
        network.add_edge(Edge::new("L-1", EdgeType::Pipe, "V-1", "V-1"));
        let topology = Topology::new(&network);
        assert_eq!(topology.incident("V-1").len(), 1);
        assert_eq!(topology.degree("V-1"), 2);
        assert_eq!(topology.roots().count(), 0);
    }

    #[test]
    fn test_empty_network() {
        let network = Network::new("gas", "Gas", Category::Gas);
        let topology = Topology::new(&network);
        assert_eq!(topology.component_count(), 0);
        assert_eq!(topology.roots().count(), 0);
    }
}
