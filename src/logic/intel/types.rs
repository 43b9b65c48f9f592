//! Knowledge graph types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VigilError;
use crate::logic::agent::lenient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    ThreatReport,
    IocFeed,
    NetworkLog,
    OsintData,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::ThreatReport => "threat_report",
            DataType::IocFeed => "ioc_feed",
            DataType::NetworkLog => "network_log",
            DataType::OsintData => "osint_data",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = VigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "threat_report" => Ok(DataType::ThreatReport),
            "ioc_feed" => Ok(DataType::IocFeed),
            "network_log" => Ok(DataType::NetworkLog),
            "osint_data" => Ok(DataType::OsintData),
            other => Err(VigilError::Validation(format!(
                "unknown data type '{}' (expected threat_report, ioc_feed, network_log or osint_data)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

impl GraphNode {
    pub fn new(node_type: impl Into<String>, value: impl Into<String>) -> Self {
        let node_type = node_type.into();
        let value = value.into();
        Self {
            id: format!("{}_{}", node_type, value),
            node_type,
            label: value,
            properties: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphFragment {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub summary: String,
}

impl GraphFragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
