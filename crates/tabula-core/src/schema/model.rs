use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::notation::parse_notation;

/// Identity field used when a table declares no primary key
pub const DEFAULT_KEY_FIELD: &str = "id";

/// One field of a table as declared in its schema notation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub is_primary_key: bool,
    /// Member of the table's composite key (still addressable on its own)
    pub is_composite: bool,
}

impl FieldDescriptor {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            is_composite: false,
        }
    }

    pub fn primary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: true,
            is_composite: false,
        }
    }

    pub fn composite(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_primary_key: false,
            is_composite: true,
        }
    }
}

/// Normalized, parsed form of one table's schema notation
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl TableDescriptor {
    /// Parse a table's notation into a descriptor
    pub fn parse(name: impl Into<String>, notation: &str) -> Self {
        Self {
            name: name.into(),
            fields: parse_notation(notation),
        }
    }

    /// Descriptor with no fields, used for tables absent from the schema
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn primary_key(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_primary_key)
    }

    /// Name of the identifying field: the declared primary key, else `id`
    pub fn key_field(&self) -> &str {
        self.primary_key()
            .map(|f| f.name.as_str())
            .unwrap_or(DEFAULT_KEY_FIELD)
    }

    /// All field names in declaration order (duplicates preserved)
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Field names a form may edit: everything except the primary key
    pub fn editable_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.is_primary_key)
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Ordered set of table descriptors, built once at startup
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    tables: Vec<TableDescriptor>,
    index: HashMap<String, usize>,
}

impl SchemaModel {
    /// Build from `(table, notation)` pairs in declaration order
    ///
    /// A table name declared twice keeps its first position and takes the
    /// later notation.
    pub fn from_notations<I, N, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut model = Self::default();
        for (name, notation) in entries {
            let descriptor = TableDescriptor::parse(name, notation.as_ref());
            match model.index.get(&descriptor.name) {
                Some(&pos) => model.tables[pos] = descriptor,
                None => {
                    model
                        .index
                        .insert(descriptor.name.clone(), model.tables.len());
                    model.tables.push(descriptor);
                }
            }
        }
        model
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.index.get(name).map(|&pos| &self.tables[pos])
    }

    /// Descriptor for `name`, or an empty one when the table is unknown
    pub fn parse_table(&self, name: &str) -> TableDescriptor {
        self.table(name)
            .cloned()
            .unwrap_or_else(|| TableDescriptor::empty(name))
    }

    /// Tables in declaration order
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaModel {
        SchemaModel::from_notations([
            ("realms", "@realmId, name, createdAt, createdBy, status"),
            ("members", "@id, name, realmId"),
            ("roles", "[realmId+name]"),
        ])
    }

    #[test]
    fn test_tables_keep_declaration_order() {
        assert_eq!(sample().table_names(), vec!["realms", "members", "roles"]);
    }

    #[test]
    fn test_key_field_uses_primary_key_or_default() {
        let schema = sample();
        assert_eq!(schema.parse_table("realms").key_field(), "realmId");
        assert_eq!(schema.parse_table("members").key_field(), "id");
        assert_eq!(schema.parse_table("roles").key_field(), DEFAULT_KEY_FIELD);
    }

    #[test]
    fn test_unknown_table_parses_to_empty_descriptor() {
        let descriptor = sample().parse_table("ghosts");
        assert_eq!(descriptor.name, "ghosts");
        assert!(descriptor.fields.is_empty());
    }

    #[test]
    fn test_editable_fields_exclude_primary_key() {
        let members = sample().parse_table("members");
        assert_eq!(members.field_names(), vec!["id", "name", "realmId"]);
        assert_eq!(members.editable_field_names(), vec!["name", "realmId"]);
    }

    #[test]
    fn test_redeclared_table_keeps_position() {
        let schema = SchemaModel::from_notations([("a", "@id"), ("b", "x"), ("a", "@key, y")]);
        assert_eq!(schema.table_names(), vec!["a", "b"]);
        assert_eq!(schema.parse_table("a").key_field(), "key");
    }
}
