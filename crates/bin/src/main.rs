mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn init_tracing(verbose: u8) {
    let directive = match verbose {
        0 => "cinelog=info,cinelog_bin=info",
        1 => "cinelog=debug,cinelog_bin=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Demo { store } => commands::demo::run(&store).await,
        Command::Search {
            query,
            page,
            base_url,
            api_key,
        } => commands::search::run(&query, page, base_url, &api_key).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
