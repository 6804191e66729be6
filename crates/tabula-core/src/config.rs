//! Schema configuration
//!
//! Loaded once at process start and read-only afterwards.
//!
//! ```yaml
//! schema_version: 1
//! tables:
//!   realms: '@realmId, name, createdAt, createdBy, status'
//!   members: '@id, name, realmId'
//! irregular_plurals:
//!   realmId: realms
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::errors::{Result, TabulaError};
use crate::relations::IrregularPlurals;
use crate::schema::SchemaModel;

pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Schema of the bundled sample database
const BUILTIN_TABLES: [(&str, &str); 4] = [
    ("realms", "@realmId, name, createdAt, createdBy, status"),
    ("members", "@id, name, realmId"),
    ("roles", "[realmId+name]"),
    ("data", "@memberId, stuff"),
];

#[derive(Debug, Deserialize)]
struct RawConfig {
    schema_version: u32,
    #[serde(default)]
    tables: Mapping,
    #[serde(default)]
    irregular_plurals: Option<IrregularPlurals>,
}

/// Table notations in declaration order plus the plural overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConfig {
    pub tables: Vec<(String, String)>,
    pub irregular_plurals: IrregularPlurals,
}

impl SchemaConfig {
    pub fn builtin() -> Self {
        Self {
            tables: BUILTIN_TABLES
                .iter()
                .map(|(name, notation)| (name.to_string(), notation.to_string()))
                .collect(),
            irregular_plurals: IrregularPlurals::default(),
        }
    }

    /// Load a YAML configuration file
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the file cannot be read or does not describe a
    /// supported schema.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TabulaError::InvalidConfig {
            reason: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML configuration text
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on YAML errors, an unsupported `schema_version`, or a
    /// table entry whose name or notation is not a string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| TabulaError::InvalidConfig {
                reason: format!("YAML parse error: {}", e),
            })?;

        if raw.schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(TabulaError::InvalidConfig {
                reason: format!(
                    "Unsupported schema_version: {}. Expected {}",
                    raw.schema_version, SUPPORTED_SCHEMA_VERSION
                ),
            });
        }

        let mut tables = Vec::with_capacity(raw.tables.len());
        for (name, notation) in raw.tables {
            let name = scalar_string(&name).ok_or_else(|| TabulaError::InvalidConfig {
                reason: format!("Table name must be a string, got {:?}", name),
            })?;
            let notation = match notation {
                Value::Null => String::new(),
                other => scalar_string(&other).ok_or_else(|| TabulaError::InvalidConfig {
                    reason: format!("Notation for table '{}' must be a string", name),
                })?,
            };
            tables.push((name, notation));
        }

        Ok(Self {
            tables,
            irregular_plurals: raw.irregular_plurals.unwrap_or_default(),
        })
    }

    pub fn schema_model(&self) -> SchemaModel {
        SchemaModel::from_notations(self.tables.iter().map(|(n, s)| (n.clone(), s.as_str())))
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
