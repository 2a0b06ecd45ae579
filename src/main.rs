//! # Arcade Shelf CLI (`shelf`)
//!
//! The `shelf` binary is the command-line interface to Arcade Shelf. It
//! manages game statuses and runs the on-demand enrichment lookups.
//!
//! ## Usage
//!
//! ```bash
//! shelf --config ./config/shelf.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shelf init` | Create the SQLite database and status table |
//! | `shelf backend` | Print the active status backend |
//! | `shelf status get <key>` | Print a game's status |
//! | `shelf status set <key> <status>` | Set a status (`none` clears it) |
//! | `shelf status clear <key>` | Clear a status |
//! | `shelf status list` | List every stored status |
//! | `shelf export` | Export the Want to Play list |
//! | `shelf marquee <key> --out <file>` | Download marquee artwork |
//! | `shelf details <key>` | Arcade-database summary and artwork URLs |
//! | `shelf search --year <year>` | Ranked newspaper articles for a season |
//! | `shelf links "<title>"` | Research links for a title |
//!
//! Logs go to stderr; stdout carries only command output.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use arcade_shelf::archive::{self, MatchMode, SearchArgs};
use arcade_shelf::config;
use arcade_shelf::models::{status_label, Status};
use arcade_shelf::session::Session;
use arcade_shelf::status::StatusService;
use arcade_shelf::{enrich, export, links, migrate};

/// Arcade Shelf CLI: game statuses with remote/local persistence and
/// on-demand enrichment.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means local-only defaults.
#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Arcade Shelf: game statuses, marquees, metadata, and archive search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/shelf.toml`. If the file does not exist,
    /// statuses are stored in `./data/shelf.sqlite` unless remote
    /// credentials are set in the environment.
    #[arg(long, global = true, default_value = "./config/shelf.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the local database.
    ///
    /// Creates the SQLite file and the `game_status` table. Idempotent.
    Init,

    /// Print the active status backend (`remote` or `local`).
    Backend,

    /// Read or change game statuses.
    Status {
        #[command(subcommand)]
        action: StatusAction,
    },

    /// Export keys holding a status (default: want_to_play).
    Export {
        /// Status to export.
        #[arg(long, default_value = Status::WANT_TO_PLAY)]
        status: Status,

        /// Emit JSON instead of plain text.
        #[arg(long)]
        json: bool,

        /// Write to a file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Download marquee artwork, falling back to the default marquee.
    Marquee {
        /// ROM short name.
        key: String,

        /// Destination file.
        #[arg(long)]
        out: PathBuf,
    },

    /// Show arcade-database details for a ROM.
    Details {
        /// ROM short name.
        key: String,

        /// Skip the artwork URL list.
        #[arg(long)]
        no_images: bool,
    },

    /// Search the newspaper archive for one season.
    Search {
        /// Season year.
        #[arg(long)]
        year: i32,

        /// Free-text keywords (default: the subject's names for that year).
        #[arg(long)]
        keywords: Option<String>,

        /// How keywords combine.
        #[arg(long, value_enum)]
        mode: Option<MatchMode>,

        /// Restrict to a US state, e.g. "new york".
        #[arg(long)]
        region: Option<String>,

        /// Maximum number of results requested upstream.
        #[arg(long)]
        limit: Option<u32>,

        /// Keep results that never mention the subject by name.
        #[arg(long)]
        loose: bool,
    },

    /// Print research links for a game title.
    Links {
        /// Game title.
        title: String,
    },
}

/// Status subcommands.
#[derive(Subcommand)]
enum StatusAction {
    /// Print the status of a key, or `none`.
    Get {
        key: String,

        /// Print the human label instead of the stored value.
        #[arg(long)]
        label: bool,
    },
    /// Set the status of a key; `none` clears it.
    Set { key: String, status: String },
    /// Clear the status of a key.
    Clear { key: String },
    /// List stored statuses as `key<TAB>status`.
    List {
        /// Only list keys holding this status.
        #[arg(long)]
        status: Option<Status>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "arcade_shelf=debug"
    } else {
        "arcade_shelf=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_status(service: &StatusService, action: StatusAction) -> anyhow::Result<()> {
    let mut session = Session::new();
    match action {
        StatusAction::Get { key, label } => {
            let status = service.get_status(&mut session, &key).await?;
            match (status, label) {
                (status, true) => println!("{}", status_label(status.as_ref())),
                (Some(s), false) => println!("{}", s),
                (None, false) => println!("none"),
            }
        }
        StatusAction::Set { key, status } => {
            service
                .set_status(&mut session, &key, Status::parse_opt(&status))
                .await?;
        }
        StatusAction::Clear { key } => {
            service.set_status(&mut session, &key, None).await?;
        }
        StatusAction::List { status } => {
            let map = service.statuses(&mut session).await?;
            for (key, s) in map.iter().filter(|(_, s)| status.as_ref().map_or(true, |f| *s == f)) {
                println!("{}\t{}", key, s);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Links need no config at all.
    if let Commands::Links { title } = &cli.command {
        links::run_links(title);
        return Ok(());
    }

    let cfg = config::load_or_minimal(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Backend => {
            let service = StatusService::from_config(&cfg).await?;
            println!("{}", service.active_backend().as_str());
        }
        Commands::Status { action } => {
            let service = StatusService::from_config(&cfg).await?;
            run_status(&service, action).await?;
        }
        Commands::Export {
            status,
            json,
            output,
        } => {
            let service = StatusService::from_config(&cfg).await?;
            let mut session = Session::new();
            export::run_export(&service, &mut session, &status, json, output.as_deref()).await?;
        }
        Commands::Marquee { key, out } => {
            enrich::run_marquee(&cfg, &key, &out).await?;
        }
        Commands::Details { key, no_images } => {
            enrich::run_details(&cfg, &key, !no_images).await?;
        }
        Commands::Search {
            year,
            keywords,
            mode,
            region,
            limit,
            loose,
        } => {
            archive::run_search(
                &cfg,
                SearchArgs {
                    year,
                    keywords,
                    mode,
                    region,
                    limit,
                    loose,
                },
            )
            .await?;
        }
        Commands::Links { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
