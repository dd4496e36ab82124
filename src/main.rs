use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use folioboard::core::log::init_logging;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for folioboard::AppCommand {
    fn from(cmd: Commands) -> folioboard::AppCommand {
        match cmd {
            Commands::Serve { port } => folioboard::AppCommand::Serve { port },
            Commands::Summary => folioboard::AppCommand::Summary,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the portfolio API
    Serve {
        /// Port to listen on, overriding the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch live data once and print the portfolio
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match (&cli.command, cli.verbose) {
        (_, true) => LevelFilter::DEBUG,
        (Some(Commands::Serve { .. }), false) => LevelFilter::INFO,
        _ => LevelFilter::WARN,
    };
    init_logging(level);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => folioboard::cli::setup::setup_at_path(path),
            None => folioboard::cli::setup::setup(),
        },
        Some(cmd) => folioboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
