//! JSON graph/pattern files and interval expressions.
//!
//! Graph file:
//!
//! ```json
//! {
//!   "horizon": 10,
//!   "directed": false,
//!   "nodes": [{ "id": 0, "labels": [{ "label": "author", "spans": [[0, 10]] }] }],
//!   "edges": [{ "src": 0, "dst": 1, "times": [1, 2, 3] }]
//! }
//! ```
//!
//! Spans are half-open `[start, end)`. Pattern file:
//!
//! ```json
//! { "patterns": [{ "id": 1, "nodes": ["author", "author"], "edges": [[0, 1]] }] }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use durograph_temporal::{LabelInterner, Lifespan, NodeId, PatternGraph, TemporalGraph};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub horizon: u32,
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    #[serde(default)]
    pub labels: Vec<LabelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpec {
    pub label: String,
    #[serde(default)]
    pub times: Vec<u32>,
    #[serde(default)]
    pub spans: Vec<[u32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub src: NodeId,
    pub dst: NodeId,
    #[serde(default)]
    pub times: Vec<u32>,
    #[serde(default)]
    pub spans: Vec<[u32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFile {
    pub patterns: Vec<PatternSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    pub id: u32,
    pub nodes: Vec<String>,
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
}

impl GraphFile {
    pub fn build(&self, labels: &LabelInterner) -> Result<TemporalGraph> {
        let mut builder = TemporalGraph::builder(self.horizon, self.directed);

        for node in &self.nodes {
            builder.add_node(node.id);
            for spec in &node.labels {
                let label = labels.intern(&spec.label);
                for &t in &spec.times {
                    builder
                        .set_label(node.id, label, t)
                        .with_context(|| format!("node {} label `{}`", node.id, spec.label))?;
                }
                for &[start, end] in &spec.spans {
                    builder
                        .set_label_span(node.id, label, start..end)
                        .with_context(|| format!("node {} label `{}`", node.id, spec.label))?;
                }
            }
        }

        for edge in &self.edges {
            for &t in &edge.times {
                builder
                    .add_edge(edge.src, edge.dst, t)
                    .with_context(|| format!("edge {} -> {}", edge.src, edge.dst))?;
            }
            for &[start, end] in &edge.spans {
                builder
                    .add_edge_span(edge.src, edge.dst, start..end)
                    .with_context(|| format!("edge {} -> {}", edge.src, edge.dst))?;
            }
        }

        Ok(builder.build())
    }
}

impl PatternSpec {
    pub fn build(&self, directed: bool, labels: &LabelInterner) -> Result<PatternGraph> {
        if self.nodes.is_empty() {
            bail!("pattern {} has no nodes", self.id);
        }
        let mut pattern = PatternGraph::new(self.id, directed);
        for name in &self.nodes {
            pattern.add_node(labels.intern(name));
        }
        for &[src, dst] in &self.edges {
            pattern
                .add_edge(src, dst)
                .with_context(|| format!("pattern {} edge {src} -> {dst}", self.id))?;
        }
        Ok(pattern)
    }
}

/// Load a graph from JSON, or from a binary snapshot when the file carries
/// the snapshot extension.
pub fn load_graph(path: &Path) -> Result<(TemporalGraph, LabelInterner)> {
    if path.extension().is_some_and(|ext| ext == "dgs") {
        return TemporalGraph::load(path);
    }

    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: GraphFile =
        serde_json::from_str(&text).with_context(|| format!("parsing graph {}", path.display()))?;
    let labels = LabelInterner::new();
    let graph = file.build(&labels)?;
    Ok((graph, labels))
}

pub fn load_patterns(path: &Path, directed: bool, labels: &LabelInterner) -> Result<Vec<PatternGraph>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: PatternFile =
        serde_json::from_str(&text).with_context(|| format!("parsing patterns {}", path.display()))?;
    file.patterns
        .iter()
        .map(|spec| spec.build(directed, labels))
        .collect()
}

/// Parse `all` or a comma-separated list of instants and half-open ranges,
/// e.g. `0..4,7,9..12`.
pub fn parse_interval(expr: &str, horizon: u32) -> Result<Lifespan> {
    let expr = expr.trim();
    if expr.eq_ignore_ascii_case("all") {
        return Ok(Lifespan::full(horizon));
    }

    let mut interval = Lifespan::new();
    for part in expr.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once("..") {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().with_context(|| format!("bad instant in `{part}`"))?;
                let end: u32 = end.trim().parse().with_context(|| format!("bad instant in `{part}`"))?;
                if start >= end {
                    return Err(anyhow!("empty range `{part}`"));
                }
                interval.set_span(start..end);
            }
            None => {
                let t: u32 = part.parse().with_context(|| format!("bad instant `{part}`"))?;
                interval.set(t);
            }
        }
    }

    if interval.is_empty() {
        bail!("interval `{expr}` selects no instants");
    }
    if interval.end() > horizon {
        bail!("interval `{expr}` reaches past the graph horizon {horizon}");
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn rendered_instants_parse_back(instants in prop::collection::btree_set(0u32..50, 1..20)) {
            let expr = instants.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
            let interval = parse_interval(&expr, 50).unwrap();
            prop_assert_eq!(interval.to_vec(), instants.into_iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn intervals_parse_ranges_and_instants() {
        let interval = parse_interval("0..3, 7,9..10", 12).unwrap();
        assert_eq!(interval.to_vec(), vec![0, 1, 2, 7, 9]);
        assert_eq!(parse_interval("ALL", 4).unwrap().cardinality(), 4);

        assert!(parse_interval("5..5", 12).is_err());
        assert!(parse_interval("0..20", 12).is_err());
        assert!(parse_interval("x", 12).is_err());
        assert!(parse_interval(" , ", 12).is_err());
    }

    #[test]
    fn graph_file_builds_with_interned_labels() {
        let file: GraphFile = serde_json::from_str(
            r#"{
                "horizon": 6,
                "nodes": [
                    { "id": 0, "labels": [{ "label": "a", "spans": [[0, 6]] }] },
                    { "id": 1, "labels": [{ "label": "b", "times": [2, 3] }] }
                ],
                "edges": [{ "src": 0, "dst": 1, "times": [2], "spans": [[4, 6]] }]
            }"#,
        )
        .unwrap();
        let labels = LabelInterner::new();
        let graph = file.build(&labels).unwrap();

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edge(1, 0).unwrap().to_vec(), vec![2, 4, 5]);
        let b = labels.id_of("b").unwrap();
        assert_eq!(graph.label_lifespan(1, b).unwrap().to_vec(), vec![2, 3]);
    }

    #[test]
    fn out_of_range_instants_are_reported() {
        let file = GraphFile {
            horizon: 4,
            directed: true,
            nodes: vec![],
            edges: vec![EdgeSpec {
                src: 0,
                dst: 1,
                times: vec![9],
                spans: vec![],
            }],
        };
        assert!(file.build(&LabelInterner::new()).is_err());
    }
}
