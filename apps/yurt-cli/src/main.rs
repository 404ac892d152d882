//! # yurt-cli
//!
//! Command-line interface for Yurt content repositories.
//!
//! Inspect and manage git-backed content without the editor UI:
//! - `yurt configs` — list the content types a repository declares
//! - `yurt show` — print a content type's records
//! - `yurt preview` — validate a pending edit and print the exact file
//!   commits it would produce, without writing
//! - `yurt draft status/diff/ensure/discard` — work with the draft branch
//! - `yurt publish` — merge the active draft into the default branch

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yurt_gitstore::GithubStore;

/// Yurt CLI — inspect and publish git-backed content.
#[derive(Parser)]
#[command(name = "yurt", version, about)]
struct Cli {
    /// Repository as owner/name (e.g. "acme/site-content").
    #[arg(long, global = true, default_value = "")]
    repo: String,

    /// Branch to read from (defaults to the repository default branch;
    /// draft commands resolve the active draft themselves).
    #[arg(long, global = true)]
    branch: Option<String>,

    /// API base URL override, for GitHub Enterprise hosts.
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the content types declared in the repository.
    Configs,
    /// Print a content type's records as JSON.
    Show {
        /// Content-type slug (see `yurt configs`).
        slug: String,
    },
    /// Show the commits a pending save, create, or delete would produce,
    /// without writing anything.
    Preview {
        /// Content-type slug (see `yurt configs`).
        slug: String,
        /// Path to the record JSON ("-" or omitted reads stdin).
        #[arg(long)]
        record: Option<String>,
        /// Treat the record as a new item instead of an update.
        #[arg(long)]
        create: bool,
        /// Preview deleting the item with this identifier instead.
        #[arg(long, conflicts_with_all = ["record", "create"])]
        delete: Option<String>,
    },
    /// Work with the draft branch.
    Draft {
        #[command(subcommand)]
        command: commands::draft::DraftCommands,
    },
    /// Merge the active draft into the default branch and delete it.
    Publish {
        /// Publish even when the default branch moved since the draft was
        /// cut (the draft's versions win).
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("yurt_content=info".parse()?)
                .add_directive("yurt_draft=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let store = build_store(&cli)?;

    match &cli.command {
        Commands::Configs => commands::configs::execute(&store, cli.branch.as_deref()).await,
        Commands::Show { slug } => {
            commands::show::execute(&store, slug, cli.branch.as_deref()).await
        }
        Commands::Preview {
            slug,
            record,
            create,
            delete,
        } => {
            commands::preview::execute(
                &store,
                slug,
                record.as_deref(),
                *create,
                delete.as_deref(),
                cli.branch.as_deref(),
            )
            .await
        }
        Commands::Draft { command } => commands::draft::execute(command, &store).await,
        Commands::Publish { force } => commands::publish::execute(&store, *force).await,
    }
}

fn build_store(cli: &Cli) -> anyhow::Result<GithubStore> {
    let (owner, repo) = cli
        .repo
        .split_once('/')
        .ok_or_else(|| anyhow::anyhow!("--repo must be owner/name"))?;
    let token = std::env::var("GITHUB_TOKEN")
        .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN environment variable is not set"))?;

    let store = GithubStore::new(owner, repo, token);
    Ok(match &cli.api_base {
        Some(base) => store.with_api_base(base),
        None => store,
    })
}
