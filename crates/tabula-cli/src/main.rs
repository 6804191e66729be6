//! Tabula CLI
//!
//! Command-line interface for exploring a schema-described data store

use clap::{Parser, Subcommand};
use tabula_core::logging_facility::{init, Profile};

mod commands;

use commands::GlobalArgs;

#[derive(Debug, Parser)]
#[command(name = "tabula")]
#[command(about = "Tabula - schema-driven data explorer", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List declared tables with their fields
    Tables,
    /// Inferred relationship edges
    Edges(commands::schema::EdgesArgs),
    /// Table graph with record counts
    Graph,
    /// Fields of one table
    Fields(commands::schema::FieldsArgs),
    /// Selectable values for a foreign-key field
    Options(commands::records::OptionsArgs),
    /// List records of a table
    List(commands::records::ListArgs),
    /// Fetch one record
    Get(commands::records::GetArgs),
    /// Create a record from key=value pairs
    Create(commands::records::CreateArgs),
    /// Merge key=value pairs into an existing record
    Update(commands::records::UpdateArgs),
    /// Parse a location and show what it selects
    Navigate(commands::navigate::NavigateArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init(if cli.global.log_json {
        Profile::Production
    } else {
        Profile::Development
    });

    let result = match commands::Context::from_args(&cli.global) {
        Ok(ctx) => match cli.command {
            Commands::Tables => commands::schema::execute_tables(&ctx),
            Commands::Edges(args) => commands::schema::execute_edges(&ctx, args),
            Commands::Graph => commands::schema::execute_graph(&ctx).await,
            Commands::Fields(args) => commands::schema::execute_fields(&ctx, args),
            Commands::Options(args) => commands::records::execute_options(&ctx, args).await,
            Commands::List(args) => commands::records::execute_list(&ctx, args).await,
            Commands::Get(args) => commands::records::execute_get(&ctx, args).await,
            Commands::Create(args) => commands::records::execute_create(&ctx, args).await,
            Commands::Update(args) => commands::records::execute_update(&ctx, args).await,
            Commands::Navigate(args) => commands::navigate::execute(&ctx, args).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
