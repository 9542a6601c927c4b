mod cli;
mod config;
mod engine;
mod graph;
mod logging;
mod retrieval;
mod services;
mod template;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cardflow")]
#[command(about = "Run card-based LLM workflows - start, retrieve, prompt, act, format")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding .cardflow/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Write logs to the default per-run log file
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,

    /// Output format: console, json or quiet
    #[arg(long, global = true, default_value = "console")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow graph
    Run {
        /// Graph file exported by the editor
        graph: PathBuf,
    },

    /// Validate a graph without running it
    Validate {
        /// Graph file exported by the editor
        graph: PathBuf,
    },

    /// List card types and their default properties
    Cards,

    /// Add text files to the document store
    Ingest {
        /// Text files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Document database (overrides [retrieval].database)
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// List ingested documents
    Documents {
        /// Delete the document with this id instead of listing
        #[arg(long)]
        delete: Option<i64>,

        /// Document database (overrides [retrieval].database)
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match (&cli.log_file, cli.log, &cli.command) {
        (Some(path), _, _) => Some(path.clone()),
        (None, true, Commands::Run { graph }) => {
            let name = graph
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "run".to_string());
            Some(logging::default_log_path(&name)?)
        }
        (None, true, _) => Some(logging::default_log_path("cardflow")?),
        (None, false, _) => None,
    };
    let mode = if cli.quiet {
        cli::OutputMode::Quiet
    } else {
        cli::OutputMode::from_str(&cli.output)
    };
    let log_guard = logging::init_logging(
        cli.debug,
        cli.quiet,
        mode == cli::OutputMode::Json,
        log_file,
    )?;
    let handler = cli::create_handler(mode);

    let project_dir = cli.dir.as_deref();
    let config = config::CardflowConfig::load(project_dir)?;

    let exit_code = match cli.command {
        Commands::Run { graph } => {
            let token = cli::CancellationToken::new();
            tokio::spawn(cli::setup_signal_handlers(token.clone()));
            cli::run_graph(&graph, &config, &*handler, &token).await?
        }

        Commands::Validate { graph } => cli::validate_graph(&graph, &*handler)?,

        Commands::Cards => {
            cli::list_cards(&*handler);
            0
        }

        Commands::Ingest { files, database } => {
            let store = cli::open_store(&config, database.as_deref())?;
            cli::ingest_documents(&files, &store, &*handler)?
        }

        Commands::Documents { delete, database } => {
            let store = cli::open_store(&config, database.as_deref())?;
            match delete {
                Some(id) => cli::delete_document(&store, id, &*handler)?,
                None => {
                    cli::list_documents(&store, &*handler)?;
                    0
                }
            }
        }
    };

    if exit_code != 0 {
        drop(log_guard);
        std::process::exit(exit_code);
    }

    Ok(())
}
