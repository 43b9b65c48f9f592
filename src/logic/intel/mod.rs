//! Intel Module - Knowledge-graph stage
//!
//! ## Structure
//! - `types`: Node, edge and fragment types
//! - `ingest`: Raw data -> fragment (model extraction + IOC feed mapping)
//! - `graph`: Aggregate graph with merge rules

pub mod graph;
pub mod ingest;
pub mod types;

pub use graph::{KnowledgeGraph, MergeStats};
pub use ingest::{feed_nodes, KnowledgeGraphIngestor};
pub use types::{DataType, GraphEdge, GraphFragment, GraphNode};
