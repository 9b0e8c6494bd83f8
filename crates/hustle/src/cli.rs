//! Clap CLI definitions for the `hustle` command (spec §6 "In-memory
//! wire" surfaced as a CLI, per SPEC_FULL's CLI driver section).

use clap::{Args, Parser, Subcommand};

/// hustle -- analytical query engine.
#[derive(Parser, Debug)]
#[command(
    name = "hustle",
    about = "Analytical query engine",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Catalog document path (default: `./hustle_catalog.json`).
    #[arg(long, global = true)]
    pub catalog: Option<String>,

    /// Optional TOML file overriding `EngineConfig` defaults.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Worker thread count (overrides `--config`/hardware concurrency).
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Enable verbose/debug logging.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// All available subcommands (spec §6: `create_table`, `drop_table`,
/// `execute_query`, `get_plan`).
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a table with the given columns.
    CreateTable(CreateTableArgs),

    /// Drop a table.
    DropTable(DropTableArgs),

    /// Run a SELECT and print the result.
    Query(QueryArgs),

    /// Print the textual query plan for a SELECT without running it.
    Explain(QueryArgs),
}

#[derive(Args, Debug)]
pub struct CreateTableArgs {
    /// Table name.
    pub name: String,

    /// A column spec `name:type[:pk][:null]`, e.g. `lo_orderkey:int:pk` or
    /// `lo_name:text:null`. Repeat for every column. `type` is one of
    /// `int`, `text`, or `bytes(N)`.
    #[arg(long = "column", required = true)]
    pub columns: Vec<String>,
}

#[derive(Args, Debug)]
pub struct DropTableArgs {
    /// Table name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// The SQL `SELECT` statement.
    pub sql: String,
}
