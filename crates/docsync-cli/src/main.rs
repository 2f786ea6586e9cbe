mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "docsync",
    about = "Fetch documentation and keep skill, command and agent catalogs in a JSON manifest",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .docsync/ or .git/)
    #[arg(long, global = true, env = "DOCSYNC_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .docsync/ with a default config and an empty manifest
    Init,

    /// Fetch remote sources and record changes in the manifest
    Fetch {
        /// Source id, or `all`
        #[arg(long, default_value = "all")]
        source: String,
    },

    /// List manifest entries
    List {
        /// Only entries where KEY equals VALUE (repeatable; matches kind, identifier or metadata)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Only entries of this kind (doc, skill, command, agent)
        #[arg(long)]
        kind: Option<String>,
    },

    /// Show one manifest entry
    Show { identifier: String },

    /// Rescan local catalogs and prune orphaned entries
    Sync,

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Fetch { source } => cmd::fetch::run(&root, &source, cli.json),
        Commands::List { filters, kind } => {
            cmd::list::run(&root, &filters, kind.as_deref(), cli.json)
        }
        Commands::Show { identifier } => cmd::list::show(&root, &identifier, cli.json),
        Commands::Sync => cmd::sync::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
