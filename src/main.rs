use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxview::core::Currency;
use fxview::core::log::init_logging;

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

impl From<Commands> for fxview::AppCommand {
    fn from(cmd: Commands) -> fxview::AppCommand {
        match cmd {
            Commands::Convert { amount, base } => fxview::AppCommand::Convert { amount, base },
            Commands::Watch => fxview::AppCommand::Watch,
            Commands::Wallet => fxview::AppCommand::Wallet,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount into every other currency
    Convert {
        /// Amount to convert (defaults to the configured amount)
        #[arg(short, long, allow_hyphen_values = true)]
        amount: Option<String>,
        /// Base currency (defaults to the configured currency)
        #[arg(short, long)]
        base: Option<Currency>,
    },
    /// Interactive converter reading amounts and currencies from stdin
    Watch,
    /// Connect the configured wallet and show its address
    Wallet,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fxview::cli::setup::setup_at_path(path),
            None => fxview::cli::setup::setup(),
        },
        Some(cmd) => fxview::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
