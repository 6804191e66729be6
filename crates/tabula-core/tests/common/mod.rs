use tabula_core::{IrregularPlurals, SchemaConfig, SchemaModel};

/// Schema of the bundled sample database
#[allow(dead_code)]
pub fn builtin_schema() -> SchemaModel {
    SchemaConfig::builtin().schema_model()
}

#[allow(dead_code)]
pub fn default_plurals() -> IrregularPlurals {
    IrregularPlurals::default()
}

/// Schema built from `(table, notation)` pairs
#[allow(dead_code)]
pub fn schema_of(entries: &[(&str, &str)]) -> SchemaModel {
    SchemaModel::from_notations(entries.iter().copied())
}
