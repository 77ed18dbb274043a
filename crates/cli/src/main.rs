//! Savepoint CLI - sp command

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;

/// Savepoint - autosave and snapshots for your project workspace
#[derive(Parser)]
#[command(name = "sp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a workspace in the current directory
    Init {
        /// Title for a new workspace.json
        #[arg(long, default_value = "Untitled workspace")]
        title: String,
    },
    /// Show workspace and save status
    Status,
    /// Start an edit session that autosaves workspace.json
    Edit {
        /// Override the configured debounce window
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
    /// Save workspace.json now
    Save,
    /// Save and record a snapshot
    Snapshot {
        /// Name for the snapshot
        #[arg(short, long)]
        label: Option<String>,
    },
    /// Show snapshot timeline
    Log {
        /// Number of snapshots to show (default: 20)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show snapshot details
    Show {
        /// Snapshot ID, prefix, or label
        snapshot: String,
        /// Include diff against the previous snapshot
        #[arg(short = 'p', long)]
        patch: bool,
    },
    /// Show diff between snapshots
    Diff {
        /// First snapshot ID, prefix, or label
        snapshot_a: String,
        /// Second snapshot (default: workspace.json on disk)
        snapshot_b: Option<String>,
        /// Number of context lines
        #[arg(short = 'U', long, default_value = "3")]
        context: usize,
    },
    /// Restore workspace.json to a snapshot
    Restore {
        /// Snapshot ID, prefix, or label
        snapshot: String,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Run garbage collection on snapshots
    Gc,
    /// View or edit system configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Print one value
    Get {
        /// Dotted key, e.g. autosave.debounce_ms
        key: String,
    },
    /// Set one value
    Set { key: String, value: String },
    /// Print the config file location
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Edit sessions also log to .sp/logs/session.log
    let log_dir = match &cli.command {
        Commands::Edit { .. } => cli_lib::util::workspace_paths()
            .ok()
            .map(|paths| paths.logs_dir())
            .filter(|dir| dir.is_dir()),
        _ => None,
    };
    let _log_guard = cli_lib::logging::init_tracing(log_dir.as_deref());

    match cli.command {
        Commands::Init { title } => cmd::init::run(&title).await,
        Commands::Status => cmd::status::run().await,
        Commands::Edit { debounce_ms } => cmd::edit::run(debounce_ms).await,
        Commands::Save => cmd::save::run().await,
        Commands::Snapshot { label } => cmd::snapshot::run(label).await,
        Commands::Log { limit } => cmd::log::run(limit).await,
        Commands::Show { snapshot, patch } => cmd::show::run(&snapshot, patch).await,
        Commands::Diff {
            snapshot_a,
            snapshot_b,
            context,
        } => cmd::diff::run(&snapshot_a, snapshot_b.as_deref(), context).await,
        Commands::Restore { snapshot, yes } => cmd::restore::run(&snapshot, yes).await,
        Commands::Gc => cmd::gc::run().await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
