//! Knowledge Graph - aggregate of ingested fragments
//!
//! Merge rules:
//! - nodes are keyed by id; the first label wins, properties are merged
//!   with newer values overwriting older ones
//! - edges are keyed by (source, target, label); the higher weight wins
//! - edges whose endpoints are unknown are kept and reported

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::types::{GraphEdge, GraphFragment, GraphNode};
use crate::error::{VigilError, VigilResult};

type EdgeKey = (String, String, String);

#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    node_index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    edge_index: HashMap<EdgeKey, usize>,
}

/// What a merge changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub nodes_added: usize,
    pub edges_added: usize,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fragment(fragment: GraphFragment) -> Self {
        let mut graph = Self::new();
        graph.absorb(fragment);
        graph
    }

    pub fn load(path: &Path) -> VigilResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("cannot read graph {}: {}", path.display(), e)))?;
        let fragment: GraphFragment = serde_json::from_str(&raw)
            .map_err(|e| VigilError::Config(format!("invalid graph {}: {}", path.display(), e)))?;
        Ok(Self::from_fragment(fragment))
    }

    pub fn save(&self, path: &Path) -> VigilResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| VigilError::Config(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&self.to_fragment(String::new()))
            .map_err(|e| VigilError::Config(e.to_string()))?;
        fs::write(path, json).map_err(|e| VigilError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    pub fn absorb(&mut self, fragment: GraphFragment) -> MergeStats {
        let mut stats = MergeStats::default();
        for node in fragment.nodes {
            if self.add_node(node) {
                stats.nodes_added += 1;
            }
        }
        for edge in fragment.edges {
            if self.add_edge(edge) {
                stats.edges_added += 1;
            }
        }
        stats
    }

    /// Returns true when the id was new
    pub fn add_node(&mut self, mut node: GraphNode) -> bool {
        if let Some(&idx) = self.node_index.get(&node.id) {
            if let Some(incoming) = node.properties.take() {
                self.nodes[idx]
                    .properties
                    .get_or_insert_with(Default::default)
                    .extend(incoming);
            }
            return false;
        }

        if node.label.trim().is_empty() {
            node.label = node.id.clone();
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Returns true when the (source, target, label) triple was new
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        let key = (edge.source.clone(), edge.target.clone(), edge.label.clone());
        if let Some(&idx) = self.edge_index.get(&key) {
            let existing = &mut self.edges[idx];
            existing.weight = match (existing.weight, edge.weight) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
            return false;
        }

        self.edge_index.insert(key, self.edges.len());
        self.edges.push(edge);
        true
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Edges with at least one endpoint that is not a known node
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|e| !self.node_index.contains_key(&e.source) || !self.node_index.contains_key(&e.target))
            .collect()
    }

    pub fn to_fragment(&self, summary: String) -> GraphFragment {
        GraphFragment {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edge(source: &str, target: &str, label: &str, weight: Option<f64>) -> GraphEdge {
        GraphEdge {
            source: source.into(),
            target: target.into(),
            label: label.into(),
            weight,
        }
    }

    #[test]
    fn test_node_merge_keeps_first_label_and_updates_properties() {
        let mut graph = KnowledgeGraph::new();
        let mut first = GraphNode::new("IP", "198.51.100.24");
        first.properties = Some(json!({ "asn": "AS64500", "seen": 1 }).as_object().cloned().unwrap());
        let mut second = GraphNode::new("IP", "198.51.100.24");
        second.label = "C2 server".into();
        second.properties = Some(json!({ "seen": 2, "port": 4444 }).as_object().cloned().unwrap());

        assert!(graph.add_node(first));
        assert!(!graph.add_node(second));

        let node = graph.node("IP_198.51.100.24").unwrap();
        assert_eq!(node.label, "198.51.100.24");
        let props = node.properties.as_ref().unwrap();
        assert_eq!(props["asn"], "AS64500");
        assert_eq!(props["seen"], 2);
        assert_eq!(props["port"], 4444);
        assert_eq!(graph.nodes().len(), 1);
    }

    #[test]
    fn test_edge_merge_keeps_higher_weight() {
        let mut graph = KnowledgeGraph::new();
        graph.add_edge(edge("Domain_a.example", "IP_198.51.100.24", "RESOLVES_TO", Some(0.4)));
        graph.add_edge(edge("Domain_a.example", "IP_198.51.100.24", "RESOLVES_TO", Some(0.9)));
        graph.add_edge(edge("Domain_a.example", "IP_198.51.100.24", "RESOLVES_TO", None));
        graph.add_edge(edge("Domain_a.example", "IP_198.51.100.24", "HOSTS", None));

        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.edges()[0].weight, Some(0.9));
    }

    #[test]
    fn test_dangling_edges_reported() {
        let mut graph = KnowledgeGraph::new();
        let stats = graph.absorb(GraphFragment {
            nodes: vec![GraphNode::new("Domain", "a.example")],
            edges: vec![edge("Domain_a.example", "IP_203.0.113.1", "RESOLVES_TO", None)],
            summary: String::new(),
        });

        assert_eq!(stats, MergeStats { nodes_added: 1, edges_added: 1 });
        assert_eq!(graph.dangling_edges().len(), 1);

        graph.add_node(GraphNode::new("IP", "203.0.113.1"));
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph").join("kg.json");

        let mut graph = KnowledgeGraph::new();
        graph.add_node(GraphNode::new("Malware", "AgentTesla"));
        graph.save(&path).unwrap();

        let loaded = KnowledgeGraph::load(&path).unwrap();
        assert!(loaded.node("Malware_AgentTesla").is_some());
        assert!(KnowledgeGraph::load(&dir.path().join("missing.json")).unwrap().nodes().is_empty());
    }
}
