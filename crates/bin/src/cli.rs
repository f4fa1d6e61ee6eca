use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "cinelog",
    version,
    about = "Movie sessions, search, and ratings from the terminal"
)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive walkthrough against bundled in-memory services.
    Demo {
        /// File that keeps ratings (and other local data) between runs.
        #[arg(long, env = "CINELOG_STORE", default_value = "cinelog-store.json")]
        store: PathBuf,
    },

    /// One-shot movie search against a hosted catalog.
    Search {
        /// Query text.
        query: String,

        /// Result page to fetch.
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Catalog API root.
        #[arg(
            long,
            env = "CINELOG_CATALOG_URL",
            default_value = "https://api.themoviedb.org/3"
        )]
        base_url: Url,

        /// Catalog API key.
        #[arg(long, env = "CINELOG_CATALOG_KEY")]
        api_key: String,
    },
}
