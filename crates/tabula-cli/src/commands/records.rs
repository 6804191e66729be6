//! Record commands
//!
//! Usage:
//!   tabula list <TABLE>
//!   tabula get <TABLE> <ID>
//!   tabula create <TABLE> [FIELD=VALUE]...
//!   tabula update <TABLE> <ID> [FIELD=VALUE]...
//!   tabula options <FIELD>
//!
//! Values are stored as strings.

use clap::Args;
use serde_json::Value;
use tabula_core::errors::{ExError, ExErrorKind};
use tabula_core::Record;

use super::{print_json, CommandResult, Context};

#[derive(Debug, Args)]
pub struct ListArgs {
    pub table: String,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    pub table: String,
    pub id: String,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub table: String,

    /// Field assignments (name=value)
    pub fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub table: String,
    pub id: String,

    /// Field assignments (name=value)
    pub fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct OptionsArgs {
    /// Foreign-key field, e.g. realmId
    pub field: String,
}

/// Parse `name=value` assignments into a record; later names win
pub fn parse_assignments(assignments: &[String]) -> Result<Record, ExError> {
    let mut record = Record::new();
    for assignment in assignments {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_assignment")
                .with_message(format!("Expected name=value, got '{}'", assignment))
        })?;
        if name.is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_assignment")
                .with_message(format!("Missing field name in '{}'", assignment)));
        }
        record.insert(name.to_string(), Value::String(value.to_string()));
    }
    Ok(record)
}

pub async fn execute_list(ctx: &Context, args: ListArgs) -> CommandResult {
    let rows = ctx.engine.list(&args.table).await?;
    print_json(&rows)
}

pub async fn execute_get(ctx: &Context, args: GetArgs) -> CommandResult {
    match ctx.engine.get(&args.table, &args.id).await? {
        Some(record) => print_json(&record),
        None => Err(ExError::new(ExErrorKind::NotFound)
            .with_table(args.table.clone())
            .with_record_id(args.id.clone())
            .with_message(format!("No record {} in {}", args.id, args.table))
            .into()),
    }
}

pub async fn execute_create(ctx: &Context, args: CreateArgs) -> CommandResult {
    let data = parse_assignments(&args.fields)?;
    let record = ctx.engine.create(&args.table, data).await?;
    print_json(&record)
}

pub async fn execute_update(ctx: &Context, args: UpdateArgs) -> CommandResult {
    let data = parse_assignments(&args.fields)?;
    let record = ctx.engine.update(&args.table, &args.id, data).await?;
    print_json(&record)
}

pub async fn execute_options(ctx: &Context, args: OptionsArgs) -> CommandResult {
    let options = ctx.engine.foreign_key_options(&args.field).await?;
    print_json(&options)
}
