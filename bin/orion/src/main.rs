mod commands;

use clap::{Parser, Subcommand};
use orion_core::Paths;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "orion")]
#[command(about = "Natural-language command assistant for files and data", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default)
    Chat,

    /// Process a single request and exit
    Run {
        /// Request text, e.g. "creá carpeta 'mi_app' y archivo 'app.js'"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Execute a YAML pipeline file
    Pipeline {
        /// Path to the pipeline file
        file: PathBuf,
    },

    /// Inspect plugins
    Plugins {
        #[command(subcommand)]
        command: PluginsCommands,
    },

    /// List registered capabilities, plugins included
    Capabilities,

    /// Show recent commands
    History {
        /// Number of entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Inspect or reset the conversation context
    Context {
        #[command(subcommand)]
        command: ContextCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum PluginsCommands {
    /// Load plugins and show their state
    List,
    /// Show plugin directories found under the configured roots
    Discover,
}

#[derive(Subcommand)]
enum ContextCommands {
    /// Print every context slot
    Show,
    /// Empty every context slot
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(paths: &Paths, verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    paths.ensure_dirs()?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.log_file())?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().json().with_writer(Mutex::new(log_file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = Paths::new();
    init_logging(&paths, cli.verbose)?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            commands::chat::run(&paths).await?;
        }
        Commands::Run { text } => {
            commands::run_cmd::run(&paths, &text.join(" ")).await?;
        }
        Commands::Pipeline { file } => {
            commands::run_cmd::pipeline(&paths, &file).await?;
        }
        Commands::Plugins { command } => match command {
            PluginsCommands::List => {
                commands::plugins_cmd::list(&paths)?;
            }
            PluginsCommands::Discover => {
                commands::plugins_cmd::discover(&paths)?;
            }
        },
        Commands::Capabilities => {
            commands::capabilities_cmd::list(&paths)?;
        }
        Commands::History { limit } => {
            commands::history_cmd::show(&paths, limit)?;
        }
        Commands::Context { command } => match command {
            ContextCommands::Show => {
                commands::context_cmd::show(&paths)?;
            }
            ContextCommands::Clear => {
                commands::context_cmd::clear(&paths)?;
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::config_cmd::show(&paths)?;
            }
            ConfigCommands::Init { force } => {
                commands::config_cmd::init(&paths, force)?;
            }
        },
    }

    Ok(())
}
