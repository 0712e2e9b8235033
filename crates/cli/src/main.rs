use std::process::ExitCode;

use clap::Parser;

use blueprint_cli::args::{Cli, Commands};
use blueprint_cli::commands;

fn main() -> ExitCode {
    let cli = Cli::parse();
    blueprint_observability::init(cli.log_format);

    let result = match &cli.command {
        Commands::Run(args) => commands::run(args).map(|report| {
            print!("{report}");
            if let Some(index) = report.resume_index() {
                println!("resume with --start-index {index}");
            }
        }),
        Commands::Chunk(args) => commands::chunk(args).map(|range| println!("({}, {})", range.start, range.end)),
        Commands::MergeDisallowed(args) => {
            commands::merge(args).map(|matched| println!("matched {matched} customers"))
        }
        Commands::ResolveUsers(args) => commands::resolve_users(args).map(|rows| println!("resolved {rows} rows")),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
