//! `hustle` -- analytical query engine CLI.
//!
//! Parses CLI arguments with clap, opens an [`engine::Engine`] from the
//! resolved catalog/config, and dispatches to the four operations spec §6
//! names: `create_table`, `drop_table`, `execute_query`, `get_plan`.

use clap::Parser;

use hustle_cli::cli::{Cli, Commands};
use hustle_cli::engine::QueryOutcome;
use hustle_cli::{context, output, schema_spec};

fn main() {
    let _ = ctrlc::set_handler(|| {
        std::process::exit(130);
    });

    let cli = Cli::parse();
    context::init_logging(cli.global.verbose);

    let result = run(&cli);

    if let Err(err) = result {
        eprintln!("Error: {}: {}", err.kind, err.message);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> hustle_core::Result<()> {
    let engine = context::open_engine(&cli.global)?;

    match &cli.command {
        Some(Commands::CreateTable(args)) => {
            let schema = schema_spec::parse_schema(&args.columns)?;
            let created = engine.create_table(&args.name, schema)?;
            if !created {
                eprintln!("table `{}` already exists", args.name);
                std::process::exit(1);
            }
        }
        Some(Commands::DropTable(args)) => {
            let dropped = engine.drop_table(&args.name)?;
            if !dropped {
                eprintln!("table `{}` does not exist", args.name);
                std::process::exit(1);
            }
        }
        Some(Commands::Query(args)) => match engine.execute_query(&args.sql)? {
            QueryOutcome::Rows(batch) => {
                output::print_batch(&batch).map_err(|err| hustle_core::HustleError::execution_error(err.to_string()))?;
            }
            QueryOutcome::Fallback(text) => println!("{text}"),
        },
        Some(Commands::Explain(args)) => {
            let plan = engine.get_plan(&args.sql)?;
            println!("{plan}");
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
        }
    }

    engine.shutdown()
}
