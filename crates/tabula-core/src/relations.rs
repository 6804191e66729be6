//! Relationship inference by foreign-key naming convention
//!
//! A field ending in `Id` is read as a reference to another table. The target
//! name comes from the irregular-plural table when listed there, otherwise
//! from stripping the suffix and appending `s`. Targets that are not declared,
//! and references back to the declaring table, are dropped silently.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::schema::SchemaModel;

/// Reserved suffix marking a foreign-key field
pub const FOREIGN_KEY_SUFFIX: &str = "Id";

/// Inferred foreign-key link between two tables
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: String,
    pub target: String,
    pub via_field: String,
    /// `{source}-{target}-{via_field}`; stable across recomputation
    pub id: String,
}

impl RelationshipEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        via_field: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        let via_field = via_field.into();
        let id = edge_id(&source, &target, &via_field);
        Self {
            source,
            target,
            via_field,
            id,
        }
    }
}

pub fn edge_id(source: &str, target: &str, via_field: &str) -> String {
    format!("{}-{}-{}", source, target, via_field)
}

/// Field name to table name overrides for the pluralization rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IrregularPlurals(BTreeMap<String, String>);

impl IrregularPlurals {
    /// An empty table: every field goes through the general rule
    pub fn none() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn insert(&mut self, field: impl Into<String>, table: impl Into<String>) {
        self.0.insert(field.into(), table.into());
    }

    pub fn lookup(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for IrregularPlurals {
    /// The owning-entity and member-entity mappings
    fn default() -> Self {
        Self::from_pairs([("realmId", "realms"), ("memberId", "members")])
    }
}

/// Table a foreign-key field refers to, or `None` for non-key fields
pub fn target_table_for(field: &str, irregulars: &IrregularPlurals) -> Option<String> {
    let stem = field.strip_suffix(FOREIGN_KEY_SUFFIX)?;
    if let Some(table) = irregulars.lookup(field) {
        return Some(table.to_string());
    }
    Some(format!("{}s", stem))
}

/// Infer the relationship graph of a schema
///
/// Tables are visited in declaration order and fields in descriptor order, so
/// the output order is fully determined by the schema. An edge listed twice
/// (same field declared twice) is kept once.
pub fn infer_edges(schema: &SchemaModel, irregulars: &IrregularPlurals) -> Vec<RelationshipEdge> {
    let mut edges = Vec::new();
    let mut seen = HashSet::new();

    for table in schema.tables() {
        for field in &table.fields {
            let Some(target) = target_table_for(&field.name, irregulars) else {
                continue;
            };
            if target == table.name || !schema.contains(&target) {
                continue;
            }
            let edge = RelationshipEdge::new(&table.name, target, &field.name);
            if seen.insert(edge.id.clone()) {
                edges.push(edge);
            }
        }
    }

    tracing::debug!(edge_count = edges.len(), "inferred relationship edges");
    edges
}

/// Edges touching `table`: outgoing first, then incoming
pub fn neighbors<'a>(edges: &'a [RelationshipEdge], table: &str) -> Vec<&'a RelationshipEdge> {
    let outgoing = edges.iter().filter(|e| e.source == table);
    let incoming = edges.iter().filter(|e| e.target == table);
    outgoing.chain(incoming).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> SchemaModel {
        SchemaModel::from_notations([
            ("realms", "@realmId, name, createdAt, createdBy, status"),
            ("members", "@id, name, realmId"),
            ("roles", "[realmId+name]"),
            ("data", "@memberId, stuff"),
        ])
    }

    #[test]
    fn test_target_table_general_rule() {
        let irregulars = IrregularPlurals::none();
        assert_eq!(
            target_table_for("teamId", &irregulars),
            Some("teams".to_string())
        );
        assert_eq!(target_table_for("name", &irregulars), None);
        assert_eq!(target_table_for("Id", &irregulars), Some("s".to_string()));
    }

    #[test]
    fn test_target_table_irregular_wins() {
        let irregulars = IrregularPlurals::from_pairs([("personId", "people")]);
        assert_eq!(
            target_table_for("personId", &irregulars),
            Some("people".to_string())
        );
    }

    #[test]
    fn test_builtin_schema_edges() {
        let edges = infer_edges(&builtin(), &IrregularPlurals::default());
        let ids: Vec<&str> = edges.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "members-realms-realmId",
                "roles-realms-realmId",
                "data-members-memberId",
            ]
        );
    }

    #[test]
    fn test_self_reference_dropped() {
        // realms declares realmId as its own primary key
        let edges = infer_edges(&builtin(), &IrregularPlurals::default());
        assert!(edges.iter().all(|e| e.source != e.target));
    }

    #[test]
    fn test_unknown_target_dropped() {
        let schema = SchemaModel::from_notations([("posts", "@id, authorId, teamId")]);
        assert!(infer_edges(&schema, &IrregularPlurals::default()).is_empty());
    }

    #[test]
    fn test_duplicate_field_yields_one_edge() {
        let schema =
            SchemaModel::from_notations([("realms", "@realmId"), ("roles", "[realmId+name], realmId")]);
        let edges = infer_edges(&schema, &IrregularPlurals::default());
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0], RelationshipEdge::new("roles", "realms", "realmId"));
    }

    #[test]
    fn test_unbracketed_plus_field_still_links() {
        let schema =
            SchemaModel::from_notations([("owners", "@id, name"), ("pets", "@id, ownerId+name")]);
        let edges = infer_edges(&schema, &IrregularPlurals::default());
        assert_eq!(edges, vec![RelationshipEdge::new("pets", "owners", "ownerId")]);
    }

    #[test]
    fn test_neighbors_outgoing_then_incoming() {
        let edges = infer_edges(&builtin(), &IrregularPlurals::default());
        let around_members: Vec<&str> = neighbors(&edges, "members")
            .into_iter()
            .map(|e| e.id.as_str())
            .collect();

        assert_eq!(
            around_members,
            vec!["members-realms-realmId", "data-members-memberId"]
        );
    }
}
