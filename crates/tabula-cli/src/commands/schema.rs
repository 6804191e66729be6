//! Schema introspection commands
//!
//! Usage:
//!   tabula tables
//!   tabula edges [--table <TABLE>]
//!   tabula graph
//!   tabula fields <TABLE> [--editable]

use clap::Args;
use serde::Serialize;
use tabula_engine::{FieldView, TableGraph};

use super::{print_json, CommandResult, Context};

#[derive(Debug, Args)]
pub struct EdgesArgs {
    /// Only edges touching this table
    #[arg(long)]
    pub table: Option<String>,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    pub table: String,

    /// Leave out the primary key, as a form would
    #[arg(long)]
    pub editable: bool,
}

#[derive(Debug, Serialize)]
struct TableSummary<'a> {
    table: &'a str,
    key_field: &'a str,
    fields: Vec<String>,
}

pub fn execute_tables(ctx: &Context) -> CommandResult {
    let schema = ctx.engine.schema();
    let summaries: Vec<TableSummary<'_>> = schema
        .tables()
        .iter()
        .map(|t| TableSummary {
            table: &t.name,
            key_field: t.key_field(),
            fields: t.field_names(),
        })
        .collect();
    print_json(&summaries)
}

pub fn execute_edges(ctx: &Context, args: EdgesArgs) -> CommandResult {
    let edges = match args.table {
        Some(table) => ctx.engine.neighbors(&table),
        None => ctx.engine.edges(),
    };
    print_json(&edges)
}

pub async fn execute_graph(ctx: &Context) -> CommandResult {
    let graph = TableGraph::load(&ctx.engine).await?;
    print_json(&graph)
}

pub fn execute_fields(ctx: &Context, args: FieldsArgs) -> CommandResult {
    let view = if args.editable {
        FieldView::Editable
    } else {
        FieldView::Displayable
    };
    print_json(&ctx.engine.fields_for(&args.table, view))
}
