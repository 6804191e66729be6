//! Table relationship graph view model
//!
//! One node per user table with its row count, plus the inferred edges whose
//! endpoints are both present.

use std::collections::HashSet;

use serde::Serialize;
use tabula_core::relations::neighbors;
use tabula_core::storage::Storage;
use tabula_core::RelationshipEdge;

use crate::records::RecordEngine;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableNode {
    pub table: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableGraph {
    pub nodes: Vec<TableNode>,
    pub edges: Vec<RelationshipEdge>,
}

impl TableGraph {
    /// Build the graph from storage's user tables
    ///
    /// A table whose count fails still gets a node, with count 0.
    ///
    /// # Errors
    ///
    /// `StorageFailure` when storage cannot be opened.
    pub async fn load<S: Storage + ?Sized>(engine: &RecordEngine<S>) -> Result<Self> {
        engine.ensure_open().await?;

        let mut nodes = Vec::new();
        for table in engine.user_tables() {
            let count = match engine.count(&table).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!(table = %table, err.code = e.code(), "count failed, showing 0");
                    0
                }
            };
            nodes.push(TableNode { table, count });
        }

        let present: HashSet<&str> = nodes.iter().map(|n| n.table.as_str()).collect();
        let edges = engine
            .edges()
            .into_iter()
            .filter(|e| present.contains(e.source.as_str()) && present.contains(e.target.as_str()))
            .collect();

        Ok(Self { nodes, edges })
    }

    pub fn node(&self, table: &str) -> Option<&TableNode> {
        self.nodes.iter().find(|n| n.table == table)
    }

    pub fn neighbors(&self, table: &str) -> Vec<&RelationshipEdge> {
        neighbors(&self.edges, table)
    }
}
