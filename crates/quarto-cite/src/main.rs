//! quarto-cite - Pandoc citation tooling

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::resolve::{OutputFormat, ResolveArgs};
use commands::search::SearchArgs;

#[derive(Parser)]
#[command(name = "quarto-cite")]
#[command(version)]
#[command(about = "Scan, resolve and render Pandoc citations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the citation segments of a document as JSON
    Tokenize {
        /// Input file ('-' or omitted for stdin)
        input: Option<PathBuf>,
    },

    /// Print the citation groups of a document as JSON
    Extract {
        /// Input file ('-' or omitted for stdin)
        input: Option<PathBuf>,
    },

    /// Resolve and render the citations of a document
    Resolve {
        /// Input file ('-' or omitted for stdin)
        input: Option<PathBuf>,

        /// Global bibliography (CSL-JSON)
        #[arg(long)]
        bibliography: Option<PathBuf>,

        /// Citation style id, or path to a .csl file
        #[arg(long)]
        csl: Option<String>,

        /// Locale id (e.g. en-US)
        #[arg(long)]
        lang: Option<String>,

        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Search a bibliography for citation keys
    Search {
        /// Search terms
        query: String,

        /// Bibliography to search (CSL-JSON)
        #[arg(long)]
        bibliography: Option<PathBuf>,

        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging. Output goes to stdout, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarto_cite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tokenize { input } => commands::syntax::tokenize(input.as_deref()),
        Commands::Extract { input } => commands::syntax::extract(input.as_deref()),
        Commands::Resolve {
            input,
            bibliography,
            csl,
            lang,
            config,
            format,
        } => commands::resolve::execute(ResolveArgs {
            input,
            bibliography,
            csl,
            lang,
            config,
            format,
        }),
        Commands::Search {
            query,
            bibliography,
            config,
            limit,
        } => commands::search::execute(SearchArgs {
            query,
            bibliography,
            config,
            limit,
        }),
    }
}
