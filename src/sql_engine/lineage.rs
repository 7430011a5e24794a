//! Table-level lineage tracking
//!
//! A [`TableLineage`] records which tables one SQL job reads and which table
//! it writes. A [`LineageGraph`] merges many records into a single directed
//! graph with one node per table and one `source -> target` edge per pair.
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::debug;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::error::{LineageError, Result};
use super::extractors::{Extractor, ExtractorOptions};
use super::token_tree::StatementType;

/// Lineage of a single SQL job
#[derive(Debug, Clone, Serialize)]
pub struct TableLineage {
    /// Table written by the job
    pub target: String,
    /// Tables read by the job
    pub sources: BTreeSet<String>,
    /// File the SQL came from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// SHA-256 of the SQL text
    pub checksum: String,
    pub statement_type: StatementType,
    pub readonly: bool,
    pub limit: Option<u64>,
    pub extracted_at: DateTime<Utc>,
}

impl TableLineage {
    /// Build a lineage record from SQL text.
    ///
    /// The target is the table the first statement writes to. Read-only SQL
    /// has no such table, so `fallback_target` (usually the file stem) is used.
    pub fn from_sql(sql: &str, fallback_target: &str, options: &ExtractorOptions) -> Result<Self> {
        let extractor = Extractor::with_options(sql, options)?;

        let target = extractor
            .target_table()
            .unwrap_or_else(|| fallback_target.to_string());
        let sources: BTreeSet<String> = extractor
            .tables()
            .iter()
            .filter(|table| **table != target)
            .cloned()
            .collect();

        debug!("Lineage for {}: {} source(s)", target, sources.len());

        Ok(Self {
            target,
            sources,
            file: None,
            checksum: calculate_checksum(sql),
            statement_type: extractor.statement_type(),
            readonly: extractor.is_readonly(),
            limit: extractor.limit(),
            extracted_at: Utc::now(),
        })
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Directed table graph; an edge `a -> b` means `b` is built from `a`
#[derive(Debug, Default, Clone)]
pub struct LineageGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a record into the graph. Existing nodes and edges are reused.
    pub fn add_lineage(&mut self, lineage: &TableLineage) {
        let target = self.node(&lineage.target);
        for source in &lineage.sources {
            let source = self.node(source);
            if self.graph.find_edge(source, target).is_none() {
                self.graph.add_edge(source, target, ());
            }
        }
    }

    fn node(&mut self, table: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(table) {
            return index;
        }
        let index = self.graph.add_node(table.to_string());
        self.nodes.insert(table.to_string(), index);
        index
    }

    /// Tables `table` is built from, sorted
    pub fn upstream(&self, table: &str) -> Vec<String> {
        self.neighbors(table, Direction::Incoming)
    }

    /// Tables built from `table`, sorted
    pub fn downstream(&self, table: &str) -> Vec<String> {
        self.neighbors(table, Direction::Outgoing)
    }

    fn neighbors(&self, table: &str, direction: Direction) -> Vec<String> {
        let Some(&index) = self.nodes.get(table) else {
            return Vec::new();
        };
        let mut tables: Vec<String> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor].clone())
            .collect();
        tables.sort();
        tables
    }

    /// All table names, sorted
    pub fn tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = self.nodes.keys().cloned().collect();
        tables.sort();
        tables
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Groups of tables that depend on each other, each group sorted
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || self
                        .graph
                        .find_edge(component[0], component[0])
                        .is_some()
            })
            .map(|component| {
                let mut tables: Vec<String> = component
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect();
                tables.sort();
                tables
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Tables in an order where every table comes after its sources
    pub fn execution_order(&self) -> std::result::Result<Vec<String>, LineageError> {
        toposort(&self.graph, None)
            .map(|order| {
                order
                    .into_iter()
                    .map(|index| self.graph[index].clone())
                    .collect()
            })
            .map_err(|cycle| {
                let start = cycle.node_id();
                let tables = self
                    .detect_cycles()
                    .into_iter()
                    .find(|tables| tables.contains(&self.graph[start]))
                    .unwrap_or_else(|| vec![self.graph[start].clone()]);
                LineageError::Cycle { tables }
            })
    }

    /// Render the graph in Graphviz DOT format
    pub fn to_dot(&self) -> String {
        let mut result = String::from("digraph lineage {\n");
        result.push_str("  rankdir=LR;\n");
        result.push_str("  node [shape=box];\n");

        for table in self.tables() {
            result.push_str(&format!("  \"{}\";\n", table));
        }

        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(source, target)| (self.graph[source].clone(), self.graph[target].clone()))
            .collect();
        edges.sort();
        for (source, target) in edges {
            result.push_str(&format!("  \"{}\" -> \"{}\";\n", source, target));
        }

        result.push_str("}\n");
        result
    }
}
