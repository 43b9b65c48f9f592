//! Knowledge Graph Ingestor - raw security data in, graph fragment out
//!
//! The model extracts entities and relationships. For IOC feeds the JSON
//! indicators are also mapped deterministically, so a feed entry always
//! becomes a node even when the model skips it.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde_json::{json, Map, Value};

use super::graph::KnowledgeGraph;
use super::types::{DataType, GraphFragment, GraphNode};
use crate::error::VigilResult;
use crate::logic::agent::{render_template, ToolLoop};
use crate::logic::backend::{GenerateRequest, Stage};

// ============================================================================
// PROMPT
// ============================================================================

const SYSTEM: &str = "You are a cyber threat intelligence engineer who turns raw security data into \
knowledge graphs. Reply with a single JSON object and nothing else.";

const INSTRUCTIONS: &str = "Extract the security entities and the relationships between them.

Data Type: {{dataType}}
Data Content:
{{data}}

1. Nodes: one per entity, with
   - type: one of IP, Domain, URL, FileHash, ThreatActor, Malware, Vulnerability, CVE, Hostname, Email;
   - id: the type and the value joined with an underscore, e.g. IP_192.0.2.10 or CVE_CVE-2021-44228;
   - label: the readable value;
   - properties: optional extra attributes.
2. Edges: source and target node ids plus a label such as RESOLVES_TO (Domain to IP), \
COMMUNICATES_WITH (IP to IP), HOSTS (IP to Domain), USES (ThreatActor to Malware) or \
EXPLOITS (Malware to CVE); add a weight between 0 and 1 when you can judge confidence.
3. Summary: a short overview of what was extracted.

Return {\"nodes\": [...], \"edges\": [...], \"summary\": \"...\"}.";

/// Keys that name the indicator itself rather than a property of it
const TYPE_KEYS: [&str; 3] = ["type", "indicator_type", "ioc_type"];
const VALUE_KEYS: [&str; 3] = ["value", "indicator", "ioc"];

// ============================================================================
// INGESTOR
// ============================================================================

pub struct KnowledgeGraphIngestor {
    agent: ToolLoop,
}

impl KnowledgeGraphIngestor {
    pub fn new(agent: ToolLoop) -> Self {
        Self { agent }
    }

    pub async fn ingest(&self, data_type: DataType, data: &str) -> VigilResult<GraphFragment> {
        if data.trim().is_empty() {
            log::info!("Knowledge graph ingest skipped: empty {} data", data_type);
            return Ok(GraphFragment {
                nodes: Vec::new(),
                edges: Vec::new(),
                summary: format!("No {} data was provided; nothing was ingested.", data_type),
            });
        }

        let text = render_template(INSTRUCTIONS, &[("dataType", data_type.as_str()), ("data", data)]);
        let request = GenerateRequest::new(
            Stage::KnowledgeGraph,
            SYSTEM,
            text,
            json!({ "dataType": data_type, "data": data }),
        );

        let extracted: GraphFragment = self.agent.single_shot(request).await?;
        let summary = extracted.summary.clone();

        let mut graph = KnowledgeGraph::from_fragment(extracted);
        if data_type == DataType::IocFeed {
            let feed_nodes = feed_nodes(data);
            log::debug!("IOC feed mapped to {} node(s)", feed_nodes.len());
            for node in feed_nodes {
                graph.add_node(node);
            }
        }

        let dangling = graph.dangling_edges().len();
        if dangling > 0 {
            log::warn!("Knowledge graph fragment has {} edge(s) with unknown endpoints", dangling);
        }

        let summary = if summary.trim().is_empty() {
            format!(
                "Ingested {} node(s) and {} edge(s) from {} data.",
                graph.nodes().len(),
                graph.edges().len(),
                data_type
            )
        } else {
            summary
        };

        log::info!(
            "Knowledge graph ingest finished: {} node(s), {} edge(s)",
            graph.nodes().len(),
            graph.edges().len()
        );
        Ok(graph.to_fragment(summary))
    }
}

// ============================================================================
// IOC FEED MAPPING
// ============================================================================

/// Map JSON indicator objects (single, array, wrapped or NDJSON) to nodes
pub fn feed_nodes(data: &str) -> Vec<GraphNode> {
    let items: Vec<Value> = match serde_json::from_str::<Value>(data.trim()) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(obj)) => {
            let wrapped = ["data", "indicators", "iocs"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(Value::as_array).cloned());
            wrapped.unwrap_or_else(|| vec![Value::Object(obj)])
        }
        Ok(_) => Vec::new(),
        Err(_) => data
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
            .collect(),
    };

    items.iter().filter_map(feed_node).collect()
}

fn feed_node(item: &Value) -> Option<GraphNode> {
    let obj = item.as_object()?;
    let value = VALUE_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))?
        .trim();
    if value.is_empty() {
        return None;
    }

    let declared = TYPE_KEYS.iter().find_map(|key| obj.get(*key).and_then(Value::as_str));
    let node_type = declared.and_then(canonical_type).or_else(|| detect_type(value))?;

    let mut node = GraphNode::new(node_type, canonical_value(node_type, value));
    let properties: Map<String, Value> = obj
        .iter()
        .filter(|(k, _)| !TYPE_KEYS.contains(&k.as_str()) && !VALUE_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !properties.is_empty() {
        node.properties = Some(properties);
    }
    Some(node)
}

/// Feed type names (MISP, STIX and plain spellings) to node types
fn canonical_type(declared: &str) -> Option<&'static str> {
    let t = declared.trim().to_lowercase().replace('_', "-");
    let canonical = match t.as_str() {
        "ip" | "ipv4" | "ipv6" | "ip-addr" | "ipv4-addr" | "ipv6-addr" | "ip-src" | "ip-dst" | "ip-address" => "IP",
        "domain" | "domain-name" | "fqdn" => "Domain",
        "hostname" | "host" => "Hostname",
        "url" | "uri" | "link" => "URL",
        "hash" | "md5" | "sha1" | "sha256" | "filehash" | "file-hash" | "file" => "FileHash",
        "email" | "email-addr" | "email-src" | "email-dst" => "Email",
        "cve" => "CVE",
        "vulnerability" => "Vulnerability",
        "malware" | "malware-family" => "Malware",
        "threatactor" | "threat-actor" | "actor" | "intrusion-set" => "ThreatActor",
        _ => return None,
    };
    Some(canonical)
}

/// Case-insensitive indicator values share one spelling so their ids collide
fn canonical_value(node_type: &str, value: &str) -> String {
    match node_type {
        "IP" | "Domain" | "Hostname" | "Email" | "FileHash" => value.to_lowercase(),
        "CVE" => value.to_uppercase(),
        _ => value.to_string(),
    }
}

/// Type from the value's shape when the feed does not say
fn detect_type(value: &str) -> Option<&'static str> {
    if value.parse::<Ipv4Addr>().is_ok() || value.parse::<Ipv6Addr>().is_ok() {
        return Some("IP");
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some("URL");
    }
    if value.contains('@') && value.contains('.') {
        return Some("Email");
    }
    if value.chars().all(|c| c.is_ascii_hexdigit()) && matches!(value.len(), 32 | 40 | 64) {
        return Some("FileHash");
    }
    if value.to_uppercase().starts_with("CVE-") {
        return Some("CVE");
    }
    if value.contains('.') && !value.contains('/') && !value.contains(' ') {
        return Some("Domain");
    }
    None
}
