//! Command implementations and the state they share

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabula_core::{SchemaConfig, Storage, StoreLayout};
use tabula_engine::RecordEngine;
use tabula_store::{MemoryStorage, SqliteStorage};

pub mod navigate;
pub mod records;
pub mod schema;

pub type CommandResult = Result<(), Box<dyn Error>>;

const DEFAULT_DB_PATH: &str = ".tabula/store.db";

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Schema configuration file (YAML); the sample schema when omitted
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true, default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Keep records in memory for this run only
    #[arg(long, global = true, conflicts_with = "db")]
    pub memory: bool,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

pub struct Context {
    pub engine: RecordEngine,
}

impl Context {
    pub fn from_args(args: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let config = match &args.schema {
            Some(path) => SchemaConfig::from_path(path)?,
            None => SchemaConfig::builtin(),
        };
        let schema = Arc::new(config.schema_model());
        let layout = StoreLayout::from_schema(&schema);

        let storage: Arc<dyn Storage> = if args.memory {
            Arc::new(MemoryStorage::new(layout))
        } else {
            Arc::new(SqliteStorage::at_path(&args.db, layout))
        };

        Ok(Self {
            engine: RecordEngine::new(schema, storage).with_plurals(config.irregular_plurals),
        })
    }
}

/// Pretty-print `value` as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
